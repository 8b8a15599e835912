//! Process command - extract fields from a single document with the cache.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use layoutcache_core::{fields, load_text, Extraction, Outcome};

use super::GlobalOptions;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input document (.txt or .pdf)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Exit successfully when no template applies
    #[arg(long)]
    allow_miss: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub fn run(args: ProcessArgs, options: &GlobalOptions) -> anyhow::Result<()> {
    let start = Instant::now();
    let (config, mut cache) = options.open_cache()?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());
    let text = load_text(&args.input, &config.source)?;

    let extraction = match cache.process(&text) {
        Outcome::Hit(extraction) => extraction,
        Outcome::Rejected {
            template_id,
            missing,
        } => {
            let message = format!(
                "Template {} could not extract: {}",
                template_id,
                missing.join(", ")
            );
            return fallback(&message, args.allow_miss);
        }
        Outcome::Miss { layout_signature } => {
            let message = format!("No trusted template for layout {}", layout_signature);
            return fallback(&message, args.allow_miss);
        }
    };

    let output = format_extraction(&extraction, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn fallback(message: &str, allow_miss: bool) -> anyhow::Result<()> {
    if allow_miss {
        eprintln!("{} {} - use the full extraction path", style("ℹ").blue(), message);
        Ok(())
    } else {
        anyhow::bail!("{}", message)
    }
}

/// Render an extraction in the requested format.
pub fn format_extraction(extraction: &Extraction, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(extraction)?),
        OutputFormat::Csv => format_extraction_csv(extraction),
        OutputFormat::Text => Ok(format_extraction_text(extraction)),
    }
}

fn format_extraction_csv(extraction: &Extraction) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "template_id",
        "invoice_number",
        "date",
        "total_amount",
        "vendor_name",
    ])?;

    wtr.write_record([
        extraction.template_id.as_str(),
        extraction.get(fields::INVOICE_NUMBER).unwrap_or_default(),
        extraction.get(fields::DATE).unwrap_or_default(),
        extraction.get(fields::TOTAL_AMOUNT).unwrap_or_default(),
        extraction.vendor_name.as_str(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_extraction_text(extraction: &Extraction) -> String {
    let mut out = String::new();

    out.push_str(&format!("Template: {}\n", extraction.template_id));
    out.push_str(&format!("Vendor: {}\n", extraction.vendor_name));
    for (field, value) in &extraction.fields {
        out.push_str(&format!("  {}: {}\n", field, value));
    }

    out
}
