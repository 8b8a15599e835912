//! Layout-learning template cache for invoice extraction.
//!
//! This crate provides:
//! - Layout fingerprints that ignore numbers and dates
//! - A catalog of per-field extraction rules
//! - Rule synthesis from one successful expensive extraction
//! - A persisted, reliability-tracked template store
//! - Template matching and validated local extraction

pub mod cache;
pub mod error;
pub mod invoice;
pub mod models;
pub mod source;
pub mod template;

pub use cache::{CacheStatistics, Outcome, SharedTemplateCache, TemplateCache, TemplateStatistics};
pub use error::{CacheError, ExtractionError, Result, SourceError, StoreError};
pub use invoice::{fields, PatternCatalog, CATALOG_VERSION};
pub use models::config::CacheConfig;
pub use models::template::Template;
pub use source::load_text;
pub use template::{
    fingerprint, structural_keywords, Extraction, PatternSynthesizer, TemplateExtractor,
    TemplateMatcher, TemplateStore,
};
