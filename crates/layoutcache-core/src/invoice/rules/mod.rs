//! Static catalog of per-field extraction rules.
//!
//! Rules are listed per field in priority order: more specific, labeled
//! patterns come first. The catalog is shared read-only state; templates only
//! store rule identifiers that point back into it.

pub mod amounts;
pub mod dates;
pub mod patterns;

pub use amounts::{amounts_agree, parse_amount};
pub use dates::{date_readings, dates_agree};

use lazy_static::lazy_static;
use regex::Regex;

use patterns::*;

/// Catalog revision. Bump when rules are added, removed or reordered.
pub const CATALOG_VERSION: u32 = 1;

/// Recognized field names.
pub mod fields {
    pub const INVOICE_NUMBER: &str = "invoice_number";
    pub const DATE: &str = "date";
    pub const TOTAL_AMOUNT: &str = "total_amount";
    pub const VENDOR_NAME: &str = "vendor_name";

    /// Fields a template extraction must produce to be trusted.
    pub const REQUIRED: [&str; 3] = [INVOICE_NUMBER, DATE, TOTAL_AMOUNT];
}

/// A value captured by a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// Captured value, trimmed.
    pub value: String,
    /// Full text matched by the rule.
    pub matched: String,
}

/// One candidate extraction rule.
#[derive(Debug)]
pub struct CatalogRule {
    id: &'static str,
    field: &'static str,
    pattern: &'static Regex,
}

impl CatalogRule {
    /// Stable identifier persisted in templates.
    pub fn id(&self) -> &'static str {
        self.id
    }

    /// Field this rule extracts.
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Apply the rule to `text`, returning the first capture group (or the
    /// whole match when the pattern has no groups).
    pub fn capture(&self, text: &str) -> Option<RuleMatch> {
        let caps = self.pattern.captures(text)?;
        let full = caps.get(0)?;
        let value = caps.get(1).unwrap_or(full).as_str().trim().to_string();

        Some(RuleMatch {
            value,
            matched: full.as_str().to_string(),
        })
    }
}

/// The fixed rule library consulted when learning a layout.
#[derive(Debug)]
pub struct PatternCatalog {
    rules: Vec<CatalogRule>,
}

lazy_static! {
    static ref BUILTIN: PatternCatalog = PatternCatalog {
        rules: vec![
            rule("invoice_number.labeled", fields::INVOICE_NUMBER, &INVOICE_NUMBER_LABELED),
            rule("invoice_number.bill", fields::INVOICE_NUMBER, &BILL_NUMBER_LABELED),
            rule("invoice_number.reference", fields::INVOICE_NUMBER, &REFERENCE_NUMBER),
            rule("date.labeled_dmy", fields::DATE, &DATE_LABELED_DMY),
            rule("date.iso", fields::DATE, &DATE_ISO),
            rule("date.long", fields::DATE, &DATE_LONG),
            rule("total_amount.labeled", fields::TOTAL_AMOUNT, &TOTAL_LABELED),
            rule("total_amount.amount_due", fields::TOTAL_AMOUNT, &AMOUNT_DUE),
            rule("total_amount.grand_total", fields::TOTAL_AMOUNT, &GRAND_TOTAL),
            rule("vendor_name.first_line", fields::VENDOR_NAME, &VENDOR_FIRST_LINE),
            rule("vendor_name.from", fields::VENDOR_NAME, &VENDOR_FROM),
        ],
    };
}

fn rule(id: &'static str, field: &'static str, pattern: &'static Regex) -> CatalogRule {
    CatalogRule { id, field, pattern }
}

impl PatternCatalog {
    /// The built-in catalog.
    pub fn builtin() -> &'static PatternCatalog {
        &BUILTIN
    }

    pub fn version(&self) -> u32 {
        CATALOG_VERSION
    }

    /// Candidate rules for a field, in priority order.
    pub fn rules_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a CatalogRule> + 'a {
        self.rules.iter().filter(move |r| r.field == field)
    }

    /// Look up a rule by identifier.
    pub fn rule(&self, id: &str) -> Option<&CatalogRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Whether the catalog knows any rule for `field`.
    pub fn knows_field(&self, field: &str) -> bool {
        self.rules.iter().any(|r| r.field == field)
    }

    /// Recognized fields, in catalog order.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        for rule in &self.rules {
            if !out.contains(&rule.field) {
                out.push(rule.field);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_ids_are_unique() {
        let catalog = PatternCatalog::builtin();
        for r in &catalog.rules {
            assert_eq!(catalog.rules.iter().filter(|o| o.id == r.id).count(), 1, "{}", r.id);
        }
    }

    #[test]
    fn test_rule_ids_are_prefixed_with_field() {
        for r in &PatternCatalog::builtin().rules {
            assert!(r.id.starts_with(&format!("{}.", r.field)), "{}", r.id);
        }
    }

    #[test]
    fn test_fields_in_catalog_order() {
        assert_eq!(
            PatternCatalog::builtin().fields(),
            vec!["invoice_number", "date", "total_amount", "vendor_name"]
        );
    }

    #[test]
    fn test_rules_for_keeps_priority_order() {
        let ids: Vec<_> = PatternCatalog::builtin()
            .rules_for(fields::DATE)
            .map(|r| r.id())
            .collect();
        assert_eq!(ids, vec!["date.labeled_dmy", "date.iso", "date.long"]);
    }

    #[test]
    fn test_capture_trims_value() {
        let rule = PatternCatalog::builtin().rule("vendor_name.from").unwrap();
        let m = rule.capture("Total: $500.00 from Acme Inc  ").unwrap();
        assert_eq!(m.value, "Acme Inc");
        assert!(m.matched.starts_with("from"));
    }

    #[test]
    fn test_is_match() {
        let rule = PatternCatalog::builtin().rule("date.iso").unwrap();
        assert!(rule.is_match("Date: 2024-01-05"));
        assert!(!rule.is_match("Date: 05/01/2024"));
    }

    #[test]
    fn test_unknown_rule() {
        assert!(PatternCatalog::builtin().rule("total_amount.nope").is_none());
        assert!(!PatternCatalog::builtin().knows_field("iban"));
    }
}
