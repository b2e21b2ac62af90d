// src/cli.rs
use clap::{Parser, Subcommand};
use chrono::NaiveDate;
use std::path::PathBuf;

use crate::processing::products::{Product, Region};

#[derive(Parser)]
#[command(name = "clms-clipper")]
#[command(about = "Regional clipping and packaging of CLMS 300m vegetation products")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON configuration file (paths, ledgers, schedule)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log file, overrides the configured one
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (e.g. info, debug)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clip, quicklook, describe and zip one global source file
    Run {
        /// Product family: NDVI, DMP, FAPAR, FCOVER or LAI
        product: Product,

        /// Region of interest: AFRI or SOAM
        region: Region,

        /// Global NetCDF source file
        source: PathBuf,

        /// Output directory, overrides the configured one
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Process every scheduled product whose latest dekad is not yet in the ledger
    Automate {
        /// Run as if today were this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Render a quicklook from a JSON request file
    Quicklook {
        /// JSON quicklook request
        request: PathBuf,
    },
}
