//! Batch processing command for multiple documents.
//!
//! Each document is tried against the cache. When no template applies and a
//! sidecar `<stem>.fields.json` (the expensive extraction's output) sits next
//! to the document, the layout is learned from it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use layoutcache_core::{fields, load_text, source, Extraction, Outcome, TemplateCache};

use super::learn::read_fields;
use super::process::{format_extraction, OutputFormat};
use super::GlobalOptions;

/// Suffix of the sidecar file holding an expensive extraction.
const FIELDS_SUFFIX: &str = ".fields.json";

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Do not learn from sidecar field files
    #[arg(long)]
    no_learn: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// What happened to one file.
enum Status {
    Hit(Extraction),
    Learned(String),
    Rejected(String),
    Miss,
    Failed(String),
}

impl Status {
    fn label(&self) -> &'static str {
        match self {
            Status::Hit(_) => "template",
            Status::Learned(_) => "learned",
            Status::Rejected(_) => "rejected",
            Status::Miss => "miss",
            Status::Failed(_) => "error",
        }
    }
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    status: Status,
    processing_time_ms: u64,
}

pub fn run(args: BatchArgs, options: &GlobalOptions) -> anyhow::Result<()> {
    let start = Instant::now();
    let (config, mut cache) = options.open_cache()?;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| source::is_supported(p) && !is_sidecar(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    // Sequential: each document's match/learn cycle completes before the next.
    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let file_start = Instant::now();
        let status = match process_single_file(&path, &mut cache, &args, &config.source) {
            Ok(status) => status,
            Err(e) => {
                let error_msg = e.to_string();
                if !args.continue_on_error {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
                warn!("Failed to process {}: {}", path.display(), error_msg);
                Status::Failed(error_msg)
            }
        };

        if let (Status::Hit(extraction), Some(output_dir)) = (&status, &args.output_dir) {
            write_output(&path, extraction, output_dir, args.format)?;
        }

        results.push(ProcessResult {
            path,
            status,
            processing_time_ms: file_start.elapsed().as_millis() as u64,
        });
        progress.inc(1);
    }

    progress.finish_with_message("Complete");

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let count = |label: &str| results.iter().filter(|r| r.status.label() == label).count();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} from templates, {} learned, {} need full extraction, {} failed",
        style(count("template")).green(),
        style(count("learned")).cyan(),
        style(count("miss") + count("rejected")).yellow(),
        style(count("error")).red()
    );

    let failed: Vec<_> = results
        .iter()
        .filter_map(|r| match &r.status {
            Status::Failed(msg) => Some((&r.path, msg)),
            _ => None,
        })
        .collect();
    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for (path, msg) in failed {
            println!("  - {}: {}", path.display(), msg);
        }
    }

    Ok(())
}

fn process_single_file(
    path: &Path,
    cache: &mut TemplateCache,
    args: &BatchArgs,
    source_config: &layoutcache_core::models::config::SourceConfig,
) -> anyhow::Result<Status> {
    let text = load_text(path, source_config)?;

    let missed = match cache.process(&text) {
        Outcome::Hit(extraction) => return Ok(Status::Hit(extraction)),
        Outcome::Rejected {
            template_id,
            missing,
        } => {
            debug!(
                "{}: template {} missing {}",
                path.display(),
                template_id,
                missing.join(", ")
            );
            Status::Rejected(template_id)
        }
        Outcome::Miss { .. } => Status::Miss,
    };

    let sidecar = sidecar_path(path);
    if args.no_learn || !sidecar.exists() {
        return Ok(missed);
    }

    let observed = read_fields(&sidecar)?;
    let template_id = cache.learn(&text, &observed)?;
    debug!("{}: learned {}", path.display(), template_id);
    Ok(Status::Learned(template_id))
}

/// `<dir>/<stem>.fields.json` for `<dir>/<stem>.<ext>`.
fn sidecar_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    path.with_file_name(format!("{}{}", stem, FIELDS_SUFFIX))
}

fn is_sidecar(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(FIELDS_SUFFIX))
}

fn write_output(
    path: &Path,
    extraction: &Extraction,
    output_dir: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let output_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice");
    let output_path = output_dir.join(format!("{}.{}", output_name, format.extension()));

    fs::write(&output_path, format_extraction(extraction, format)?)?;
    debug!("Wrote output to {}", output_path.display());
    Ok(())
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "template_id",
        "invoice_number",
        "date",
        "total_amount",
        "vendor_name",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let time = result.processing_time_ms.to_string();
        let label = result.status.label();

        match &result.status {
            Status::Hit(e) => wtr.write_record([
                filename,
                label,
                &e.template_id,
                e.get(fields::INVOICE_NUMBER).unwrap_or_default(),
                e.get(fields::DATE).unwrap_or_default(),
                e.get(fields::TOTAL_AMOUNT).unwrap_or_default(),
                &e.vendor_name,
                &time,
                "",
            ])?,
            Status::Learned(id) | Status::Rejected(id) => {
                wtr.write_record([filename, label, id, "", "", "", "", &time, ""])?
            }
            Status::Miss => wtr.write_record([filename, label, "", "", "", "", "", &time, ""])?,
            Status::Failed(msg) => {
                wtr.write_record([filename, label, "", "", "", "", "", &time, msg])?
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
