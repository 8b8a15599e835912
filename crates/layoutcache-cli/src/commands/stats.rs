//! Stats command - template usage statistics.

use clap::Args;

use super::GlobalOptions;

/// Arguments for the stats command.
#[derive(Args)]
pub struct StatsArgs {
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

pub fn run(args: StatsArgs, options: &GlobalOptions) -> anyhow::Result<()> {
    let (_, cache) = options.open_cache()?;
    let stats = cache.statistics();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "=".repeat(60));
    println!("TEMPLATE USAGE STATISTICS");
    println!("{}", "=".repeat(60));
    println!();
    println!("Total Templates: {}", stats.total_templates);

    if stats.templates.is_empty() {
        println!();
        println!("No templates learned yet.");
        return Ok(());
    }

    println!();
    println!("Template Details:");
    println!("{}", "-".repeat(60));
    for t in &stats.templates {
        println!();
        println!("Template: {}", t.template_id);
        println!("  Vendor: {}", t.vendor_name);
        println!("  Total Uses: {}", t.total_uses);
        println!("  Success Rate: {:.1}%", t.success_rate);
        println!("  Last Used: {}", t.last_used.format("%Y-%m-%d %H:%M:%S"));
    }

    Ok(())
}
