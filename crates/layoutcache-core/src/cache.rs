//! Template cache: the interface the extraction pipeline talks to.
//!
//! A document's text is matched against learned layouts; a trusted match is
//! extracted locally, anything else goes to the expensive extraction path,
//! whose result is fed back through [`TemplateCache::learn`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{CacheError, ExtractionError, Result};
use crate::invoice::rules::{fields, PatternCatalog};
use crate::models::config::CacheConfig;
use crate::models::template::{template_id, Template};
use crate::template::synthesizer::scalar_text;
use crate::template::{
    fingerprint, Extraction, PatternSynthesizer, TemplateExtractor, TemplateMatcher, TemplateStore,
};

/// Vendor label used when the observed extraction names none.
pub const UNKNOWN_VENDOR: &str = "Unknown";

/// What happened to one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A trusted template extracted every required field.
    Hit(Extraction),
    /// A trusted template matched but its extraction failed validation.
    Rejected {
        template_id: String,
        missing: Vec<String>,
    },
    /// No trusted template for this layout.
    Miss { layout_signature: String },
}

impl Outcome {
    /// Whether the caller must fall back to the expensive path.
    pub fn needs_fallback(&self) -> bool {
        !matches!(self, Outcome::Hit(_))
    }
}

/// Usage figures for one template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateStatistics {
    pub template_id: String,
    pub vendor_name: String,
    pub success_count: u64,
    pub failure_count: u64,
    /// Percentage of successful uses (0 when unused).
    pub success_rate: f64,
    pub total_uses: u64,
    pub last_used: DateTime<Utc>,
}

/// Usage figures for the whole cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatistics {
    pub total_templates: usize,
    /// Most used first.
    pub templates: Vec<TemplateStatistics>,
}

/// Owns the template store and runs match, extract and learn against it.
#[derive(Debug)]
pub struct TemplateCache {
    store: TemplateStore,
    matcher: TemplateMatcher,
    catalog: &'static PatternCatalog,
}

impl TemplateCache {
    pub fn new(store: TemplateStore) -> Self {
        Self {
            store,
            matcher: TemplateMatcher::default(),
            catalog: PatternCatalog::builtin(),
        }
    }

    /// Open the configured store and matcher.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        let store = TemplateStore::from_config(&config.store);
        Ok(Self::new(store).with_matcher(TemplateMatcher::new(config.matching.min_reliability)))
    }

    pub fn with_matcher(mut self, matcher: TemplateMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn matcher(&self) -> &TemplateMatcher {
        &self.matcher
    }

    /// Trusted template for `text`'s layout.
    pub fn match_template(&self, text: &str) -> Option<Template> {
        self.matcher.find(&self.store, text).cloned()
    }

    /// Extract `text` with a previously matched template and record the outcome.
    pub fn extract(
        &mut self,
        template: &Template,
        text: &str,
    ) -> std::result::Result<Extraction, ExtractionError> {
        TemplateExtractor::new(self.catalog).extract(&mut self.store, template, text)
    }

    /// Match then extract.
    pub fn process(&mut self, text: &str) -> Outcome {
        let Some(template) = self.match_template(text) else {
            return Outcome::Miss {
                layout_signature: fingerprint(text),
            };
        };

        match self.extract(&template, text) {
            Ok(extraction) => Outcome::Hit(extraction),
            Err(ExtractionError::MissingFields {
                template_id: id,
                fields: missing,
            }) => Outcome::Rejected {
                template_id: id,
                missing,
            },
            Err(ExtractionError::UnknownTemplate(_)) => Outcome::Miss {
                layout_signature: template.layout_signature().to_string(),
            },
        }
    }

    /// Learn from a successful expensive extraction of `text`.
    ///
    /// `observed` must be a JSON object of field values. A known layout has
    /// its rules refreshed (the refresh counts as a success); an unknown one
    /// gets a new template. Returns the template id.
    pub fn learn(&mut self, text: &str, observed: &Value) -> Result<String> {
        let observed = observed.as_object().ok_or_else(|| {
            CacheError::InvalidFields(format!("expected a JSON object, got {}", kind(observed)))
        })?;
        self.learn_fields(text, observed)
    }

    pub fn learn_fields(&mut self, text: &str, observed: &Map<String, Value>) -> Result<String> {
        let signature = fingerprint(text);
        let rules = PatternSynthesizer::new(self.catalog).synthesize_all(text, observed);

        if self.store.contains(&signature) {
            let template = self.store.update(&signature, |t| {
                t.field_rules.extend(rules);
                t.record_success();
            })?;
            info!("Updated existing template: {}", template.id());
            return Ok(template.id().to_string());
        }

        let vendor = observed
            .get(fields::VENDOR_NAME)
            .and_then(scalar_text)
            .unwrap_or_else(|| UNKNOWN_VENDOR.to_string());

        let id = template_id(&signature, self.store.next_ordinal());
        let mut template = Template::new(id, vendor, signature);
        template.field_rules = rules;

        let template = self.store.insert(template)?;
        info!(
            "Learned new template: {} for {}",
            template.id(),
            template.vendor_label
        );
        Ok(template.id().to_string())
    }

    pub fn statistics(&self) -> CacheStatistics {
        let mut templates: Vec<TemplateStatistics> = self
            .store
            .iter()
            .map(|t| TemplateStatistics {
                template_id: t.id().to_string(),
                vendor_name: t.vendor_label.clone(),
                success_count: t.success_count,
                failure_count: t.failure_count,
                success_rate: t.reliability().unwrap_or(0.0) * 100.0,
                total_uses: t.total_uses(),
                last_used: t.last_used_at,
            })
            .collect();
        templates.sort_by(|a, b| b.total_uses.cmp(&a.total_uses));

        CacheStatistics {
            total_templates: self.store.len(),
            templates,
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A [`TemplateCache`] behind a single lock, for callers that process
/// documents from several threads.
///
/// Match, extract and the counter update run under one lock acquisition, so
/// concurrent documents of the same layout cannot lose an increment.
#[derive(Debug, Clone)]
pub struct SharedTemplateCache {
    inner: Arc<Mutex<TemplateCache>>,
}

impl SharedTemplateCache {
    pub fn new(cache: TemplateCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TemplateCache> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn process(&self, text: &str) -> Outcome {
        self.lock().process(text)
    }

    pub fn learn(&self, text: &str, observed: &Value) -> Result<String> {
        self.lock().learn(text, observed)
    }

    pub fn statistics(&self) -> CacheStatistics {
        self.lock().statistics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;

    const ACME_JANUARY: &str = "Invoice #1234 Date: 2024-01-05 Total: $500.00 from Acme Inc";
    const ACME_FEBRUARY: &str = "Invoice #9999 Date: 2024-02-10 Total: $750.00 from Acme Inc";

    fn acme_fields() -> Value {
        json!({
            "invoice_number": "1234",
            "date": "2024-01-05",
            "total_amount": 500.00,
            "vendor_name": "Acme Inc",
            "line_items": []
        })
    }

    fn cache() -> TemplateCache {
        TemplateCache::new(TemplateStore::in_memory())
    }

    #[test]
    fn test_learn_creates_trusted_template() {
        let mut cache = cache();
        let id = cache.learn(ACME_JANUARY, &acme_fields()).unwrap();

        let template = cache.match_template(ACME_JANUARY).unwrap();
        assert_eq!(template.id(), id);
        assert_eq!(template.success_count, 1);
        assert_eq!(template.failure_count, 0);
        assert_eq!(template.vendor_label, "Acme Inc");
        assert!(id.starts_with(&format!("TPL_{}_", &fingerprint(ACME_JANUARY)[..8])));
    }

    #[test]
    fn test_end_to_end_same_layout() {
        let mut cache = cache();
        let id = cache.learn(ACME_JANUARY, &acme_fields()).unwrap();

        let template = cache.match_template(ACME_FEBRUARY).unwrap();
        assert_eq!(template.id(), id);

        let extraction = cache.extract(&template, ACME_FEBRUARY).unwrap();
        let expected: BTreeMap<String, String> = [
            ("invoice_number", "9999"),
            ("date", "2024-02-10"),
            ("total_amount", "750.00"),
            ("vendor_name", "Acme Inc"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(extraction.fields, expected);
        assert_eq!(cache.store().get_by_id(&id).unwrap().success_count, 2);
    }

    #[test]
    fn test_relearn_updates_existing_template() {
        let mut cache = cache();
        let first = cache.learn(ACME_JANUARY, &acme_fields()).unwrap();
        let second = cache
            .learn(
                ACME_FEBRUARY,
                &json!({"invoice_number": "9999", "date": "2024-02-10", "total_amount": "750.00"}),
            )
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.store().len(), 1);
        let template = cache.store().get_by_id(&first).unwrap();
        assert_eq!(template.success_count, 2);
        assert_eq!(template.field_rules.len(), 4);
        assert_eq!(template.vendor_label, "Acme Inc");
    }

    #[test]
    fn test_process_rejects_and_counts_failure() {
        let mut cache = cache();
        let id = cache.learn(ACME_JANUARY, &acme_fields()).unwrap();

        // Same vocabulary, but the total has no digits to capture.
        let outcome = cache.process("Invoice #42 Date: 2024-03-01 Total: pending from Acme Inc");
        assert_eq!(
            outcome,
            Outcome::Rejected {
                template_id: id.clone(),
                missing: vec!["total_amount".to_string()],
            }
        );
        assert!(outcome.needs_fallback());

        let template = cache.store().get_by_id(&id).unwrap();
        assert_eq!(template.success_count, 1);
        assert_eq!(template.failure_count, 1);
    }

    #[test]
    fn test_unreliable_template_is_skipped() {
        let mut cache = cache();
        let id = cache.learn(ACME_JANUARY, &acme_fields()).unwrap();
        let signature = fingerprint(ACME_JANUARY);
        cache
            .store
            .update(&signature, |t| {
                t.success_count = 3;
                t.failure_count = 2;
            })
            .unwrap();

        assert!(cache.match_template(ACME_FEBRUARY).is_none());
        assert_eq!(
            cache.process(ACME_FEBRUARY),
            Outcome::Miss {
                layout_signature: signature
            }
        );
        assert_eq!(cache.store().get_by_id(&id).unwrap().success_count, 3);
    }

    #[test]
    fn test_disjoint_layout_never_matches() {
        let mut cache = cache();
        cache.learn(ACME_JANUARY, &acme_fields()).unwrap();

        assert!(cache.match_template("hello world 123").is_none());
        assert!(cache.match_template("").is_none());
    }

    #[test]
    fn test_learn_without_vendor_uses_unknown() {
        let mut cache = cache();
        let id = cache
            .learn(ACME_JANUARY, &json!({"invoice_number": "1234"}))
            .unwrap();
        assert_eq!(cache.store().get_by_id(&id).unwrap().vendor_label, UNKNOWN_VENDOR);
    }

    #[test]
    fn test_learn_rejects_non_object() {
        let mut cache = cache();
        let err = cache.learn(ACME_JANUARY, &json!(["1234"])).unwrap_err();
        assert!(matches!(err, CacheError::InvalidFields(_)));
        assert!(cache.store().is_empty());
    }

    #[test]
    fn test_template_ids_are_unique() {
        let mut cache = cache();
        let a = cache.learn(ACME_JANUARY, &acme_fields()).unwrap();
        let b = cache
            .learn("Receipt 7 Amount 3.00", &json!({"total_amount": "3.00"}))
            .unwrap();
        assert_ne!(a, b);
        assert!(b.ends_with("_2"));
    }

    #[test]
    fn test_statistics_sorted_by_use() {
        let mut cache = cache();
        let a = cache.learn(ACME_JANUARY, &acme_fields()).unwrap();
        let b = cache
            .learn("Receipt 7 Amount 3.00", &json!({"total_amount": "3.00"}))
            .unwrap();
        cache.learn("Receipt 8 Amount 4.00", &json!({"total_amount": "4.00"})).unwrap();

        let stats = cache.statistics();
        assert_eq!(stats.total_templates, 2);
        assert_eq!(stats.templates[0].template_id, b);
        assert_eq!(stats.templates[0].total_uses, 2);
        assert_eq!(stats.templates[1].template_id, a);
        assert_eq!(stats.templates[1].success_rate, 100.0);
    }

    #[test]
    fn test_persisted_cache_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CacheConfig::default();
        config.store.path = dir.path().join("templates.json");

        let mut cache = TemplateCache::from_config(&config).unwrap();
        let id = cache.learn(ACME_JANUARY, &acme_fields()).unwrap();
        assert!(matches!(cache.process(ACME_FEBRUARY), Outcome::Hit(_)));

        let reopened = TemplateCache::from_config(&config).unwrap();
        let template = reopened.store().get_by_id(&id).unwrap();
        assert_eq!(template.success_count, 2);
        assert_eq!(
            reopened.store().iter().collect::<Vec<_>>(),
            cache.store().iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_learning_keeps_templates_from_older_store_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CacheConfig::default();
        config.store.path = dir.path().join("templates.json");
        let older = json!({
            "templates": [{
                "template_id": "TPL_aaaaaaaa_1",
                "vendor_name": "Acme Inc",
                "layout_hash": "aaaaaaaa",
                "patterns": {},
                "field_positions": {},
                "success_count": 9,
                "failure_count": 1,
                "created_at": "2024-01-05T10:00:00.123456",
                "last_used": "2024-01-05T10:00:00.123456"
            }],
            "last_updated": "2024-01-05T10:00:00.123456"
        });
        std::fs::write(&config.store.path, older.to_string()).unwrap();

        let mut cache = TemplateCache::from_config(&config).unwrap();
        assert_eq!(cache.store().len(), 1);
        let id = cache
            .learn("Receipt 1 Amount 3.00", &json!({ "invoice_number": "1" }))
            .unwrap();
        assert!(id.ends_with("_2"));

        let reopened = TemplateCache::from_config(&config).unwrap();
        assert_eq!(reopened.store().len(), 2);
        assert!(reopened.store().get_by_id("TPL_aaaaaaaa_1").is_some());
    }

    #[test]
    fn test_shared_cache_does_not_lose_increments() {
        let mut cache = cache();
        let id = cache.learn(ACME_JANUARY, &acme_fields()).unwrap();
        let shared = SharedTemplateCache::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        assert!(matches!(shared.process(ACME_FEBRUARY), Outcome::Hit(_)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = shared.statistics();
        let template = stats.templates.iter().find(|t| t.template_id == id).unwrap();
        assert_eq!(template.success_count, 81);
    }
}
