//! Learned layout templates: fingerprinting, rule synthesis, storage,
//! matching and extraction.

pub mod extractor;
pub mod fingerprint;
pub mod matcher;
pub mod store;
pub mod synthesizer;

pub use extractor::{Extraction, TemplateExtractor};
pub use fingerprint::{fingerprint, structural_keywords};
pub use matcher::{TemplateMatcher, DEFAULT_MIN_RELIABILITY};
pub use store::TemplateStore;
pub use synthesizer::PatternSynthesizer;
