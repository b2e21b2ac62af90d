// src/batch.rs
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn};

use crate::processing::pipeline::{PipelineSettings, ProductPipeline};
use crate::processing::products::{target_date, Product, Region};
use crate::utils::ledger::Ledger;

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct BatchConfig {
    #[serde(default)]
    pub global: GlobalParams,
    /// Empty means the full daily schedule.
    #[serde(default)]
    pub operations: Vec<Operation>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GlobalParams {
    #[serde(default = "default_processed_inputs")]
    pub processed_inputs: PathBuf,
    #[serde(default = "default_processed_outputs")]
    pub processed_outputs: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_resource_dir")]
    pub resource_dir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_compress_level")]
    pub compress_level: Option<i32>,
    #[serde(default)]
    pub additional_format: Option<String>,
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            processed_inputs: default_processed_inputs(),
            processed_outputs: default_processed_outputs(),
            log_file: default_log_file(),
            log_level: default_log_level(),
            resource_dir: default_resource_dir(),
            output_dir: default_output_dir(),
            compress_level: default_compress_level(),
            additional_format: None,
            threads: None,
        }
    }
}

fn default_processed_inputs() -> PathBuf {
    PathBuf::from("/home/eouser/clms/config/processed_input_files.txt")
}

fn default_processed_outputs() -> PathBuf {
    PathBuf::from("/home/eouser/clms/config/processed_output_files.txt")
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("/home/eouser/clms/logs/clipper_automation.log"))
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_resource_dir() -> PathBuf {
    PathBuf::from("/home/eouser/clms")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/home/eouser/clms/outputs")
}

fn default_compress_level() -> Option<i32> {
    Some(9)
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Operation {
    pub product: Product,
    pub region: Region,
    /// Overrides the product's default archive root.
    pub source_root: Option<PathBuf>,
}

impl BatchConfig {
    /// Reads a JSON config; a missing path yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn scheduled(&self) -> Vec<Operation> {
        if self.operations.is_empty() {
            Product::SCHEDULE
                .iter()
                .map(|&(product, region)| Operation { product, region, source_root: None })
                .collect()
        } else {
            self.operations.clone()
        }
    }
}

impl GlobalParams {
    pub fn pipeline_settings(&self, process_date: NaiveDate) -> PipelineSettings {
        PipelineSettings {
            resource_dir: self.resource_dir.clone(),
            output_dir: self.output_dir.clone(),
            compress_level: self.compress_level,
            process_date,
            additional_format: self.additional_format.clone(),
        }
    }
}

/// Result of one scheduled unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Processed(PathBuf),
    AlreadyProcessed,
    SourceMissing,
    Failed,
}

/// Daily driver: runs every scheduled product/region whose expected source
/// exists and is not yet in the input ledger. Failures never stop the batch.
pub fn run_automation(config: &BatchConfig, today: NaiveDate) -> Vec<(Operation, UnitOutcome)> {
    let inputs = Ledger::new(&config.global.processed_inputs);
    let outputs = Ledger::new(&config.global.processed_outputs);
    let operations = config.scheduled();

    info!("==================================================");
    info!(date = %today, units = operations.len(), "Clipper automation started");

    let results = operations
        .into_iter()
        .map(|op| {
            let outcome = run_unit(&op, &config.global, today, &inputs, &outputs);
            (op, outcome)
        })
        .collect();

    info!("Clipper automation finished");
    info!("==================================================");
    results
}

fn run_unit(op: &Operation, global: &GlobalParams, today: NaiveDate, inputs: &Ledger, outputs: &Ledger) -> UnitOutcome {
    let spec = op.product.spec();
    let date = target_date(spec.dekad, today);
    let span = info_span!("unit", product = %op.product, region = %op.region, target_date = %date);
    let _guard = span.enter();

    let root = op.source_root.as_deref().unwrap_or_else(|| spec.default_source_root());
    let source = spec.source_path(root, date);
    let source_name = spec.ledger_key(date);

    if !source.is_file() {
        error!(path = %source.display(), "Input file does not exist, skipping");
        return UnitOutcome::SourceMissing;
    }
    if inputs.is_processed(&source_name) {
        info!(file = %source_name, "Already processed, skipping");
        return UnitOutcome::AlreadyProcessed;
    }

    info!(path = %source.display(), execution_date = %today, "Starting processing");
    let pipeline = ProductPipeline::new(op.product, op.region, global.pipeline_settings(today));
    match pipeline.process(&source) {
        Ok(archive) if archive.is_file() => {
            let archive_name = archive
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if let Err(e) = inputs.mark_processed(&source_name) {
                error!("Failed to record input in ledger: {e}");
            }
            if let Err(e) = outputs.mark_processed(&archive_name) {
                error!("Failed to record output in ledger: {e}");
            }
            info!(archive = %archive.display(), "Processing succeeded");
            UnitOutcome::Processed(archive)
        }
        Ok(archive) => {
            error!(archive = %archive.display(), "Pipeline finished but archive is missing");
            warn!(file = %source_name, "Not recorded as processed");
            UnitOutcome::Failed
        }
        Err(e) => {
            error!("Processing failed: {e}");
            warn!(file = %source_name, "Not recorded as processed");
            UnitOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_schedule() {
        let cfg: BatchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.global.compress_level, Some(9));
        assert_eq!(cfg.global.output_dir, PathBuf::from("/home/eouser/clms/outputs"));
        let ops = cfg.scheduled();
        assert_eq!(ops.len(), 10);
        assert_eq!((ops[0].product, ops[0].region), (Product::Ndvi, Region::Africa));
        assert_eq!((ops[9].product, ops[9].region), (Product::Dmp, Region::SouthAmerica));
    }

    #[test]
    fn test_operations_parse() {
        let cfg: BatchConfig = serde_json::from_str(
            r#"{"global": {"compress_level": 5}, "operations": [{"product": "LAI", "region": "SOAM"}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.global.compress_level, Some(5));
        let ops = cfg.scheduled();
        assert_eq!(ops.len(), 1);
        assert_eq!((ops[0].product, ops[0].region), (Product::Lai, Region::SouthAmerica));
    }
}
