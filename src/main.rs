// src/main.rs
use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use clms_clipper::batch::{run_automation, BatchConfig, UnitOutcome};
use clms_clipper::cli::{Cli, Commands};
use clms_clipper::logging::{self, LogSettings};
use clms_clipper::processing::quicklook::{generate_quicklook, QuicklookRequest};
use clms_clipper::processing::ProductPipeline;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = BatchConfig::load(cli.config.as_deref())?;

    if let Some(path) = &cli.log_file {
        config.global.log_file = Some(path.clone());
    }
    let automate = matches!(cli.command, Commands::Automate { .. });
    let level = cli.log_level.clone().unwrap_or_else(|| {
        if automate { config.global.log_level.clone() } else { "info".to_string() }
    });
    // interactive commands log to the console only unless a file is asked for
    let file = if automate || cli.log_file.is_some() { config.global.log_file.clone() } else { None };
    logging::init(&LogSettings { level, file })?;

    let threads = config.global.threads.unwrap_or_else(num_cpus::get);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .context("configuring thread pool")?;

    let today = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Run { product, region, source, output_dir } => {
            if let Some(dir) = output_dir {
                config.global.output_dir = dir;
            }
            let pipeline = ProductPipeline::new(product, region, config.global.pipeline_settings(today));
            match pipeline.process(&source) {
                Ok(archive) => {
                    info!(archive = %archive.display(), "Processing complete");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    error!(product = %product, region = %region, "Processing failed: {e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Automate { date } => {
            let results = run_automation(&config, date.unwrap_or(today));
            let processed = results
                .iter()
                .filter(|(_, o)| matches!(o, UnitOutcome::Processed(_)))
                .count();
            info!(processed, scheduled = results.len(), "Automation summary");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Quicklook { request } => {
            let content = fs::read_to_string(&request)
                .with_context(|| format!("reading quicklook request {}", request.display()))?;
            let request: QuicklookRequest = serde_json::from_str(&content).context("parsing quicklook request")?;
            match generate_quicklook(&request) {
                Ok(out) => {
                    info!(output = %out.tiff.display(), width = out.width, height = out.height, "Quicklook complete");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    error!(kind = e.kind(), "Quicklook failed: {e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}
