//! Learned extraction template for one document layout.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A reusable extraction rule set tied to one layout signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Stable identifier, assigned at creation.
    #[serde(rename = "template_id")]
    id: String,

    /// Vendor observed when the template was learned. Informational only.
    #[serde(rename = "vendor_name")]
    pub vendor_label: String,

    /// Hash of the structural fingerprint; the matching key.
    #[serde(rename = "layout_hash")]
    layout_signature: String,

    /// Field name to catalog rule identifier.
    #[serde(rename = "patterns", default)]
    pub field_rules: BTreeMap<String, String>,

    #[serde(default)]
    pub success_count: u64,

    #[serde(default)]
    pub failure_count: u64,

    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "last_used", deserialize_with = "deserialize_timestamp")]
    pub last_used_at: DateTime<Utc>,
}

impl Template {
    /// Create a template born from a successful expensive extraction.
    ///
    /// The learning event counts as the first success.
    pub fn new(
        id: impl Into<String>,
        vendor_label: impl Into<String>,
        layout_signature: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            vendor_label: vendor_label.into(),
            layout_signature: layout_signature.into(),
            field_rules: BTreeMap::new(),
            success_count: 1,
            failure_count: 0,
            created_at: now,
            last_used_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn layout_signature(&self) -> &str {
        &self.layout_signature
    }

    /// Total match attempts, including the learning event.
    pub fn total_uses(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Success ratio, or `None` when the template has no recorded outcome.
    pub fn reliability(&self) -> Option<f64> {
        match self.total_uses() {
            0 => None,
            total => Some(self.success_count as f64 / total as f64),
        }
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
        self.last_used_at = Utc::now();
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|dt| dt.and_utc()))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

/// Build the identifier for a new template: `TPL_<signature prefix>_<ordinal>`.
pub fn template_id(layout_signature: &str, ordinal: usize) -> String {
    let prefix: String = layout_signature.chars().take(8).collect();
    format!("TPL_{}_{}", prefix, ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_template_counts_learning_as_success() {
        let t = Template::new("TPL_abc_1", "Acme Inc", "abc");
        assert_eq!(t.success_count, 1);
        assert_eq!(t.failure_count, 0);
        assert_eq!(t.reliability(), Some(1.0));
        assert_eq!(t.created_at, t.last_used_at);
    }

    #[test]
    fn test_reliability_undefined_without_outcomes() {
        let mut t = Template::new("TPL_abc_1", "Acme Inc", "abc");
        t.success_count = 0;
        assert_eq!(t.reliability(), None);
    }

    #[test]
    fn test_failure_does_not_touch_last_used() {
        let mut t = Template::new("TPL_abc_1", "Acme Inc", "abc");
        let before = t.last_used_at;
        t.record_failure();
        assert_eq!(t.failure_count, 1);
        assert_eq!(t.last_used_at, before);
    }

    #[test]
    fn test_template_id_format() {
        assert_eq!(
            template_id("d41d8cd98f00b204e9800998ecf8427e", 3),
            "TPL_d41d8cd9_3"
        );
    }

    #[test]
    fn test_serialized_field_names() {
        let t = Template::new("TPL_abc_1", "Acme Inc", "abc");
        let json = serde_json::to_value(&t).unwrap();
        for key in [
            "template_id",
            "vendor_name",
            "layout_hash",
            "patterns",
            "success_count",
            "failure_count",
            "created_at",
            "last_used",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_legacy_record_fields_are_ignored() {
        let json = r#"{
            "template_id": "TPL_abc_1",
            "vendor_name": "Acme Inc",
            "layout_hash": "abc",
            "patterns": {"date": "date.iso"},
            "field_positions": {},
            "success_count": 4,
            "failure_count": 1,
            "created_at": "2024-01-05T10:00:00Z",
            "last_used": "2024-02-10T10:00:00Z"
        }"#;
        let t: Template = serde_json::from_str(json).unwrap();
        assert_eq!(t.id(), "TPL_abc_1");
        assert_eq!(t.field_rules.get("date").map(String::as_str), Some("date.iso"));
        assert_eq!(t.reliability(), Some(0.8));
    }

    #[test]
    fn test_naive_timestamps_read_as_utc() {
        let json = r#"{
            "template_id": "TPL_abc_1",
            "vendor_name": "Acme Inc",
            "layout_hash": "abc",
            "patterns": {},
            "success_count": 9,
            "failure_count": 1,
            "created_at": "2024-01-05T10:00:00.123456",
            "last_used": "2024-02-10T08:30:00"
        }"#;
        let t: Template = serde_json::from_str(json).unwrap();
        assert_eq!(t.created_at.to_rfc3339(), "2024-01-05T10:00:00.123456+00:00");
        assert_eq!(t.last_used_at.to_rfc3339(), "2024-02-10T08:30:00+00:00");
        assert_eq!(t.reliability(), Some(0.9));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-01-05T10:00:00+02:00").is_some());
    }
}
