use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use env_logger::Builder;
use log::{info, LevelFilter};
use rayon::ThreadPoolBuilder;

use haplofreq::config::Args;
use haplofreq::pipeline::make_freqs;
use haplofreq::progress::format_elapsed;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    ThreadPoolBuilder::new()
        .num_threads(args.threads.max(1))
        .build_global()
        .context("failed to configure the worker thread pool")?;

    let config = args.to_config().context("invalid command-line configuration")?;
    info!("Frequency directory: {}", config.freqs_dir.display());
    info!("Output directory: {}", config.output_dir.display());
    info!("Threads: {}", args.threads.max(1));

    let summary = make_freqs(&config).context("frequency run failed")?;

    let total: std::time::Duration = summary.timings.iter().map(|(_, t)| *t).sum();
    eprintln!(
        "{}",
        format!(
            "Done: {} haplotypes, {} reports in {}",
            summary.master_rows,
            summary.reports.len(),
            format_elapsed(total)
        )
        .green()
    );
    Ok(())
}
