// src/processing/pipeline.rs
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};

use super::clip::{clip_variables, ClipOptions, DEFAULT_CHUNK};
use super::metadata::{fill_template, Bom, Substitutions};
use super::products::{time_coverage, Product, ProductSpec, Region};
use super::quicklook::{generate_quicklook, FlagOverride, QuicklookRequest, SubsampleMode};
use super::window::{ClipRequest, Window};
use crate::error::PipelineError;
use crate::io::archive::zip_directory;

/// Where a pipeline reads resources from and writes products to.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Holds one folder per product with its colour table and XML template.
    pub resource_dir: PathBuf,
    pub output_dir: PathBuf,
    pub compress_level: Option<i32>,
    /// Reported as processing date in metadata and history.
    pub process_date: NaiveDate,
    pub additional_format: Option<String>,
}

/// Clip, quicklook, describe and package one product for one region.
pub struct ProductPipeline {
    product: Product,
    region: Region,
    settings: PipelineSettings,
}

/// Parts of a global source file name the pipeline derives names from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceName {
    /// `YYYYMMDDHHMM`
    pub stamp: String,
    pub date: NaiveDate,
    /// Source file name with the `GLOBE` field replaced by the region code.
    pub clipped: String,
}

impl SourceName {
    pub fn parse(file_name: &str, region: Region) -> Result<Self, PipelineError> {
        let bad = || PipelineError::SourceName(file_name.to_string());

        let mut fields: Vec<String> = file_name.split('_').map(str::to_string).collect();
        let stamp = fields.get(3).cloned().ok_or_else(bad)?;
        if stamp.len() != 12 || !stamp.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let date = NaiveDate::parse_from_str(&stamp[..8], "%Y%m%d").map_err(|_| bad())?;

        let globe = fields.iter().position(|f| f.contains("GLOBE")).ok_or_else(bad)?;
        fields[globe] = fields[globe].replace("GLOBE", region.code());

        Ok(Self { stamp, date, clipped: fields.join("_") })
    }

    /// Clipped name without its extension.
    pub fn clipped_stem(&self) -> &str {
        self.clipped.strip_suffix(".nc").unwrap_or(&self.clipped)
    }

    /// Clipped stem with `QL` inserted as fourth field.
    pub fn quicklook_stem(&self) -> String {
        let mut fields: Vec<&str> = self.clipped_stem().split('_').collect();
        let at = fields.len().min(3);
        fields.insert(at, "QL");
        fields.join("_")
    }
}

impl ProductPipeline {
    pub fn new(product: Product, region: Region, settings: PipelineSettings) -> Self {
        Self { product, region, settings }
    }

    fn spec(&self) -> &'static ProductSpec {
        self.product.spec()
    }

    fn resource(&self, name: &str) -> PathBuf {
        self.settings.resource_dir.join(self.spec().code).join(name)
    }

    /// Runs every stage on `source` and returns the archive path.
    pub fn process(&self, source: &Path) -> Result<PathBuf, PipelineError> {
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PipelineError::SourceName(source.display().to_string()))?;
        let name = SourceName::parse(file_name, self.region)?;

        let work_dir = self
            .settings
            .output_dir
            .join(format!("{}_{}", name.date.format("%Y%m%d"), self.region.code()));
        if work_dir.exists() {
            debug!(dir = %work_dir.display(), "Clearing stale working directory");
            fs::remove_dir_all(&work_dir)?;
        }
        fs::create_dir_all(&work_dir)?;

        let clipped = work_dir.join(&name.clipped);
        let window = self.clip(source, &clipped, &name)?;
        info!(output = %clipped.display(), "Clipped product written");

        let ql_stem = work_dir.join(name.quicklook_stem());
        let ql = generate_quicklook(&self.quicklook_request(&clipped, &ql_stem))?;
        let ql_filename = ql
            .tiff
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let description = work_dir.join(self.spec().description_name(self.region, &name.stamp));
        let template = self.resource(&self.spec().template_name(self.region));
        fill_template(
            &template,
            &self.substitutions(&name, &window, &ql_filename),
            Some((&description, Bom::Utf8)),
        )?;

        let archive = self.settings.output_dir.join(format!("{}.zip", name.clipped_stem()));
        let prefix = format!("{}/", name.date.format("%Y%m%d"));
        let entries = zip_directory(&work_dir, &archive, &prefix)?;
        info!(archive = %archive.display(), entries, "Product packaged");

        fs::remove_dir_all(&work_dir)?;
        Ok(archive)
    }

    fn clip(&self, source: &Path, output: &Path, name: &SourceName) -> Result<Window, PipelineError> {
        let spec = self.spec();
        let region = self.region.spec();

        let mut opts = ClipOptions::new(
            ClipRequest::Origin {
                lat: region.origin_lat,
                lon: region.origin_lon,
                width: region.width,
                height: region.height,
            },
            spec.variables.iter().map(|v| v.to_string()).collect(),
        );
        opts.identifier = Some(spec.identifier(self.region, &name.stamp));
        opts.parent_identifier = Some(spec.parent_identifier(self.region));
        opts.region_code = region.code.to_string();
        opts.region_name = region.name.to_string();
        opts.compress_level = self.settings.compress_level;
        opts.default_chunk = DEFAULT_CHUNK;
        opts.chunk_overrides = spec
            .chunk_overrides
            .iter()
            .map(|(v, c)| (v.to_string(), *c))
            .collect();
        opts.history_date = self.settings.process_date;

        Ok(clip_variables(source, output, &opts)?)
    }

    fn quicklook_request(&self, input: &Path, output_stem: &Path) -> QuicklookRequest {
        let ql = &self.spec().quicklook;
        QuicklookRequest {
            input: input.to_path_buf(),
            output_stem: output_stem.to_path_buf(),
            color_table: Some(self.resource(ql.color_table)),
            band: ql.band.to_string(),
            subsample: ql.subsample.to_vec(),
            subsample_mode: SubsampleMode::Percent,
            ql_min: ql.min as i64,
            ql_max: ql.max as i64,
            ql_nodata: ql.nodata as i64,
            src_min: ql.src_range.map(|r| r.0),
            src_max: ql.src_range.map(|r| r.1),
            qflag: ql.qflag.map(|(band, value, replacement)| FlagOverride {
                band: band.to_string(),
                value,
                replacement,
            }),
            honour_valid_range: ql.honour_valid_range,
            additional_format: self.settings.additional_format.clone(),
        }
    }

    fn substitutions(&self, name: &SourceName, window: &Window, ql_filename: &str) -> Substitutions {
        let spec = self.spec();
        let region = self.region.spec();
        let coverage = time_coverage(spec.dekad, name.date);

        let mut subs = Substitutions::new();
        subs.set("identifier", spec.identifier(self.region, &name.stamp))
            .set("parent_identifier", spec.parent_identifier(self.region))
            .set("process_date", self.settings.process_date.format("%Y-%m-%d"))
            .set("rows", window.height())
            .set("cols", window.width())
            .set("roi_id", region.code)
            .set("roi_name", region.name)
            .set("ul_lat", format!("{:?}", region.ul_lat))
            .set("ul_lon", format!("{:?}", region.ul_lon))
            .set("lr_lon", format!("{:?}", region.lr_lon))
            .set("lr_lat", format!("{:?}", region.lr_lat))
            .set("platform", "Sentinel-3")
            .set("sensor", "OLCI")
            .set("previous_product_identifier", "")
            .set("alternate_title", spec.alternate_title(self.region, &name.stamp))
            .set("product_date", name.date.format("%Y-%m-%d"))
            .set("time_coverage_start", coverage.start_timestamp())
            .set("time_coverage_end", coverage.end_timestamp())
            .set("product_version", spec.version)
            .set("ql_filename", ql_filename);
        subs
    }
}
