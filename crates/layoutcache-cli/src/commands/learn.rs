//! Learn command - record a layout from a successful expensive extraction.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use console::style;
use serde_json::Value;

use layoutcache_core::load_text;

use super::GlobalOptions;

/// Arguments for the learn command.
#[derive(Args)]
pub struct LearnArgs {
    /// Input document (.txt or .pdf) the fields were extracted from
    #[arg(required = true)]
    input: PathBuf,

    /// JSON file with the extracted fields
    #[arg(long)]
    fields: PathBuf,
}

pub fn run(args: LearnArgs, options: &GlobalOptions) -> anyhow::Result<()> {
    let (config, mut cache) = options.open_cache()?;

    let text = load_text(&args.input, &config.source)?;
    let observed = read_fields(&args.fields)?;

    let template_id = cache.learn(&text, &observed)?;
    let template = cache
        .store()
        .get_by_id(&template_id)
        .context("learned template missing from store")?;

    println!(
        "{} {} ({}), rules: {}",
        style("✓").green(),
        template_id,
        template.vendor_label,
        if template.field_rules.is_empty() {
            "none".to_string()
        } else {
            template
                .field_rules
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        }
    );

    if cache.store().is_dirty() {
        anyhow::bail!("Template learned but the store could not be written");
    }

    Ok(())
}

/// Read the expensive extraction's output.
pub fn read_fields(path: &Path) -> anyhow::Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading fields from {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("parsing fields from {}", path.display()))?;
    Ok(value)
}
