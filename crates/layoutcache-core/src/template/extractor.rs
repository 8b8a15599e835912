//! Applies a matched template's rules and validates the result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::store::TemplateStore;
use crate::error::ExtractionError;
use crate::invoice::rules::{fields, PatternCatalog};
use crate::models::template::Template;

/// Result type for template extraction.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Fields extracted from a document with a learned template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// Template that produced the fields.
    pub template_id: String,
    /// Vendor from the document, or the template's label when the document
    /// yielded none.
    pub vendor_name: String,
    /// Field name to extracted value.
    pub fields: BTreeMap<String, String>,
}

impl Extraction {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Runs a template's field rules against new text.
#[derive(Debug, Clone, Copy)]
pub struct TemplateExtractor<'c> {
    catalog: &'c PatternCatalog,
}

impl Default for TemplateExtractor<'static> {
    fn default() -> Self {
        Self::new(PatternCatalog::builtin())
    }
}

impl<'c> TemplateExtractor<'c> {
    pub fn new(catalog: &'c PatternCatalog) -> Self {
        Self { catalog }
    }

    /// Apply every rule of `template` to `text` without touching counters.
    ///
    /// Rules that do not match, or capture only whitespace, contribute nothing.
    pub fn apply(&self, template: &Template, text: &str) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();

        for (field, rule_id) in &template.field_rules {
            let Some(rule) = self.catalog.rule(rule_id) else {
                warn!(
                    "Template {} refers to unknown rule {} for {}",
                    template.id(),
                    rule_id,
                    field
                );
                continue;
            };

            match rule.capture(text) {
                Some(m) if !m.value.is_empty() => {
                    out.insert(field.clone(), m.value);
                }
                _ => debug!("Rule {} found nothing for {}", rule_id, field),
            }
        }

        out
    }

    /// Extract with `template` and record the outcome in `store`.
    ///
    /// Succeeds only when every required field is present. Either outcome is
    /// counted exactly once against the stored template and persisted.
    pub fn extract(
        &self,
        store: &mut TemplateStore,
        template: &Template,
        text: &str,
    ) -> Result<Extraction> {
        let signature = template.layout_signature();
        let live = store
            .get(signature)
            .filter(|t| t.id() == template.id())
            .ok_or_else(|| ExtractionError::UnknownTemplate(template.id().to_string()))?;

        let extracted = self.apply(live, text);
        let missing = missing_required(&extracted);

        if !missing.is_empty() {
            warn!(
                "Template extraction incomplete, missing required fields: {}",
                missing.join(", ")
            );
            store
                .update(signature, Template::record_failure)
                .map_err(|_| ExtractionError::UnknownTemplate(template.id().to_string()))?;
            return Err(ExtractionError::MissingFields {
                template_id: template.id().to_string(),
                fields: missing,
            });
        }

        let vendor_name = extracted
            .get(fields::VENDOR_NAME)
            .cloned()
            .unwrap_or_else(|| live.vendor_label.clone());

        store
            .update(signature, Template::record_success)
            .map_err(|_| ExtractionError::UnknownTemplate(template.id().to_string()))?;
        info!("Successfully extracted using template {}", template.id());

        Ok(Extraction {
            template_id: template.id().to_string(),
            vendor_name,
            fields: extracted,
        })
    }
}

/// Required fields absent or empty in `extracted`, in canonical order.
pub fn missing_required(extracted: &BTreeMap<String, String>) -> Vec<String> {
    fields::REQUIRED
        .iter()
        .filter(|f| extracted.get(**f).is_none_or(|v| v.trim().is_empty()))
        .map(|f| f.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::fingerprint::fingerprint;
    use pretty_assertions::assert_eq;

    const LEARNED: &str = "Invoice #1234 Date: 2024-01-05 Total: $500.00 from Acme Inc";

    fn acme_template() -> Template {
        let mut t = Template::new("TPL_acme_1", "Acme Inc", fingerprint(LEARNED));
        for (field, rule) in [
            ("invoice_number", "invoice_number.labeled"),
            ("date", "date.iso"),
            ("total_amount", "total_amount.labeled"),
            ("vendor_name", "vendor_name.from"),
        ] {
            t.field_rules.insert(field.to_string(), rule.to_string());
        }
        t
    }

    fn store_with(template: &Template) -> TemplateStore {
        let mut store = TemplateStore::in_memory();
        store.insert(template.clone()).unwrap();
        store
    }

    #[test]
    fn test_extract_success_counts_once() {
        let template = acme_template();
        let mut store = store_with(&template);

        let result = TemplateExtractor::default()
            .extract(
                &mut store,
                &template,
                "Invoice #9999 Date: 2024-02-10 Total: $750.00 from Acme Inc",
            )
            .unwrap();

        assert_eq!(result.get("invoice_number"), Some("9999"));
        assert_eq!(result.get("date"), Some("2024-02-10"));
        assert_eq!(result.get("total_amount"), Some("750.00"));
        assert_eq!(result.vendor_name, "Acme Inc");

        let stored = store.get(template.layout_signature()).unwrap();
        assert_eq!(stored.success_count, 2);
        assert_eq!(stored.failure_count, 0);
    }

    #[test]
    fn test_extract_missing_total_counts_failure() {
        let template = acme_template();
        let mut store = store_with(&template);

        let err = TemplateExtractor::default()
            .extract(&mut store, &template, "Invoice #9999 Date: 2024-02-10 from Acme Inc")
            .unwrap_err();

        assert_eq!(
            err,
            ExtractionError::MissingFields {
                template_id: "TPL_acme_1".to_string(),
                fields: vec!["total_amount".to_string()],
            }
        );
        let stored = store.get(template.layout_signature()).unwrap();
        assert_eq!(stored.success_count, 1);
        assert_eq!(stored.failure_count, 1);
        assert_eq!(stored.last_used_at, template.last_used_at);
    }

    #[test]
    fn test_template_without_required_rule_always_fails() {
        let mut template = acme_template();
        template.field_rules.remove("date");
        let mut store = store_with(&template);

        let err = TemplateExtractor::default()
            .extract(&mut store, &template, LEARNED)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::MissingFields { ref fields, .. } if fields == &["date"]));
    }

    #[test]
    fn test_vendor_falls_back_to_label() {
        let mut template = acme_template();
        template.field_rules.remove("vendor_name");
        let mut store = store_with(&template);

        let result = TemplateExtractor::default()
            .extract(&mut store, &template, LEARNED)
            .unwrap();
        assert_eq!(result.vendor_name, "Acme Inc");
        assert_eq!(result.get("vendor_name"), None);
    }

    #[test]
    fn test_unknown_rule_is_skipped() {
        let mut template = acme_template();
        template
            .field_rules
            .insert("vendor_name".to_string(), "vendor_name.retired".to_string());

        let fields = TemplateExtractor::default().apply(&template, LEARNED);
        assert_eq!(fields.len(), 3);
        assert!(!fields.contains_key("vendor_name"));
    }

    #[test]
    fn test_unregistered_template() {
        let template = acme_template();
        let mut store = TemplateStore::in_memory();

        let err = TemplateExtractor::default()
            .extract(&mut store, &template, LEARNED)
            .unwrap_err();
        assert_eq!(err, ExtractionError::UnknownTemplate("TPL_acme_1".to_string()));
    }

    #[test]
    fn test_missing_required_order() {
        let mut extracted = BTreeMap::new();
        extracted.insert("date".to_string(), " ".to_string());
        assert_eq!(
            missing_required(&extracted),
            vec!["invoice_number", "date", "total_amount"]
        );
    }
}
