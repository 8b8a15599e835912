//! Fingerprint and match commands - inspect how a document's layout is keyed.

use std::path::PathBuf;

use clap::Args;
use console::style;
use serde_json::json;

use layoutcache_core::{fingerprint, load_text, structural_keywords};

use super::GlobalOptions;

/// Arguments for the fingerprint command.
#[derive(Args)]
pub struct FingerprintArgs {
    /// Input document (.txt or .pdf)
    #[arg(required = true)]
    input: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

/// Arguments for the match command.
#[derive(Args)]
pub struct MatchArgs {
    /// Input document (.txt or .pdf)
    #[arg(required = true)]
    input: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

pub fn run(args: FingerprintArgs, options: &GlobalOptions) -> anyhow::Result<()> {
    let config = options.load_config()?;
    let text = load_text(&args.input, &config.source)?;

    let signature = fingerprint(&text);
    let keywords = structural_keywords(&text);

    if args.json {
        let out = json!({ "layout_signature": signature, "keywords": keywords });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", signature);
        if keywords.is_empty() {
            println!("{} No structural keywords found", style("!").yellow());
        } else {
            println!("Keywords: {}", keywords.join(", "));
        }
    }

    Ok(())
}

pub fn run_match(args: MatchArgs, options: &GlobalOptions) -> anyhow::Result<()> {
    let (config, cache) = options.open_cache()?;
    let text = load_text(&args.input, &config.source)?;
    let signature = fingerprint(&text);

    let known = cache.store().get(&signature);
    let trusted = cache.match_template(&text);

    if args.json {
        let out = json!({
            "layout_signature": signature,
            "template_id": known.map(|t| t.id()),
            "reliability": known.and_then(|t| t.reliability()),
            "trusted": trusted.is_some(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match (known, trusted) {
        (Some(t), Some(_)) => println!(
            "{} {} ({}, {:.1}% of {} uses)",
            style("✓").green(),
            t.id(),
            t.vendor_label,
            t.reliability().unwrap_or(1.0) * 100.0,
            t.total_uses()
        ),
        (Some(t), None) => println!(
            "{} {} is below the reliability threshold ({:.1}% <= {:.1}%)",
            style("✗").red(),
            t.id(),
            t.reliability().unwrap_or(0.0) * 100.0,
            cache.matcher().min_reliability() * 100.0
        ),
        (None, _) => println!(
            "{} No template for layout {}",
            style("ℹ").blue(),
            signature
        ),
    }

    Ok(())
}
