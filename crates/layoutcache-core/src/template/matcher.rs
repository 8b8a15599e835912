//! Exact-signature, reliability-gated template lookup.

use tracing::{debug, info};

use super::fingerprint::fingerprint;
use super::store::TemplateStore;
use crate::models::template::Template;

/// Default reliability a template must exceed to be trusted.
pub const DEFAULT_MIN_RELIABILITY: f64 = 0.7;

/// Finds the trusted template for a document's layout.
#[derive(Debug, Clone, Copy)]
pub struct TemplateMatcher {
    min_reliability: f64,
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_RELIABILITY)
    }
}

impl TemplateMatcher {
    pub fn new(min_reliability: f64) -> Self {
        Self { min_reliability }
    }

    pub fn min_reliability(&self) -> f64 {
        self.min_reliability
    }

    /// Whether a template's track record allows using it.
    ///
    /// A template with no recorded outcome is trusted unconditionally.
    pub fn is_trusted(&self, template: &Template) -> bool {
        match template.reliability() {
            None => true,
            Some(rate) => rate > self.min_reliability,
        }
    }

    /// The template registered for `text`'s layout, if it is trusted.
    pub fn find<'s>(&self, store: &'s TemplateStore, text: &str) -> Option<&'s Template> {
        self.find_by_signature(store, &fingerprint(text))
    }

    pub fn find_by_signature<'s>(
        &self,
        store: &'s TemplateStore,
        layout_signature: &str,
    ) -> Option<&'s Template> {
        let template = store.get(layout_signature)?;

        if !self.is_trusted(template) {
            debug!(
                "Template {} below reliability threshold ({}/{} successful)",
                template.id(),
                template.success_count,
                template.total_uses()
            );
            return None;
        }

        info!(
            "Found matching template: {} (success rate: {:.1}%)",
            template.id(),
            template.reliability().unwrap_or(1.0) * 100.0
        );
        Some(template)
    }
}
