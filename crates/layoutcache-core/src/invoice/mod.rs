//! Invoice field rules.

pub mod rules;

pub use rules::{fields, CatalogRule, PatternCatalog, RuleMatch, CATALOG_VERSION};
