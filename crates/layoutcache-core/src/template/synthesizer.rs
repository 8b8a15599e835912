//! Rule selection from one known-good extraction.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::invoice::rules::{amounts_agree, dates_agree, fields, PatternCatalog, RuleMatch};

/// Keys of the expensive extraction that never carry a learnable field.
pub const RESERVED_KEYS: &[&str] = &[
    "line_items",
    "source_file",
    "extraction_timestamp",
    "extraction_method",
    "template_id",
    "confidence",
    "error",
];

/// Picks, for each observed field, the catalog rule that reproduces it.
#[derive(Debug, Clone, Copy)]
pub struct PatternSynthesizer<'c> {
    catalog: &'c PatternCatalog,
}

impl Default for PatternSynthesizer<'static> {
    fn default() -> Self {
        Self::new(PatternCatalog::builtin())
    }
}

impl<'c> PatternSynthesizer<'c> {
    pub fn new(catalog: &'c PatternCatalog) -> Self {
        Self { catalog }
    }

    /// First rule for `field` whose capture on `text` agrees with `observed`.
    pub fn synthesize(&self, field: &str, observed: &str, text: &str) -> Option<&'c str> {
        let observed = observed.trim();
        if observed.is_empty() {
            return None;
        }

        self.catalog
            .rules_for(field)
            .find(|rule| {
                rule.capture(text)
                    .is_some_and(|m| is_consistent(field, observed, &m))
            })
            .map(|rule| rule.id())
    }

    /// Rules for every usable field in an observed extraction.
    ///
    /// Fields with no agreeing rule are left out.
    pub fn synthesize_all(&self, text: &str, observed: &Map<String, Value>) -> BTreeMap<String, String> {
        let mut rules = BTreeMap::new();

        for (field, value) in observed {
            if RESERVED_KEYS.contains(&field.as_str()) || !self.catalog.knows_field(field) {
                continue;
            }
            let Some(value) = scalar_text(value) else {
                continue;
            };

            match self.synthesize(field, &value, text) {
                Some(rule_id) => {
                    debug!("Field {} -> rule {}", field, rule_id);
                    rules.insert(field.clone(), rule_id.to_string());
                }
                None => debug!("No catalog rule reproduces {} = {:?}", field, value),
            }
        }

        rules
    }
}

/// String form of a scalar JSON value; `None` for null, empty strings,
/// arrays and objects.
pub fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn is_consistent(field: &str, observed: &str, found: &RuleMatch) -> bool {
    let wanted = fold(observed);
    if fold(&found.value) == wanted || fold(&found.matched).contains(&wanted) {
        return true;
    }

    match field {
        fields::TOTAL_AMOUNT => amounts_agree(observed, &found.value),
        fields::DATE => dates_agree(observed, &found.value),
        _ => false,
    }
}

fn fold(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
