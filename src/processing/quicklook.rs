// src/processing/quicklook.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::QuicklookError;
use crate::io::reader::{grid_projection, read_axis, BandView, GridInfo};
use crate::io::writer::{remove_aux_sidecar, write_copy, write_quicklook};
use crate::utils::palette::Palette;
use crate::utils::quantize::{apply_flag_override, quantize, sample_indices, Quantization};

/// How the two `subsample` numbers are read.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubsampleMode {
    /// Output size as a percentage of the input size.
    #[default]
    Percent,
    /// Keep one pixel out of every `n`.
    Factor,
}

/// Pixels of the flag band equal to `value` are painted `replacement`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FlagOverride {
    pub band: String,
    pub value: f64,
    pub replacement: u8,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct QuicklookRequest {
    pub input: PathBuf,
    /// Output path without extension; `.tiff` (and `.png`) are appended.
    pub output_stem: PathBuf,
    pub color_table: Option<PathBuf>,
    pub band: String,
    #[serde(default = "default_subsample")]
    pub subsample: Vec<i64>,
    #[serde(default)]
    pub subsample_mode: SubsampleMode,
    #[serde(default)]
    pub ql_min: i64,
    #[serde(default = "default_ql_max")]
    pub ql_max: i64,
    #[serde(default = "default_ql_nodata")]
    pub ql_nodata: i64,
    pub src_min: Option<f64>,
    pub src_max: Option<f64>,
    pub qflag: Option<FlagOverride>,
    /// Send source values outside the valid range to `ql_nodata`.
    #[serde(default)]
    pub honour_valid_range: bool,
    pub additional_format: Option<String>,
}

fn default_subsample() -> Vec<i64> {
    vec![100, 100]
}

fn default_ql_max() -> i64 {
    250
}

fn default_ql_nodata() -> i64 {
    255
}

#[derive(Debug, Clone)]
pub struct QuicklookOutput {
    pub tiff: PathBuf,
    pub secondary: Option<PathBuf>,
    pub width: usize,
    pub height: usize,
}

impl QuicklookRequest {
    /// Checks everything that can be checked before touching the input.
    pub fn validate(&self) -> Result<(), QuicklookError> {
        for (name, v) in [("ql_nodata", self.ql_nodata), ("ql_min", self.ql_min), ("ql_max", self.ql_max)] {
            if !(0..=255).contains(&v) {
                return Err(QuicklookError::Validation(format!("{name} must be in [0, 255], got {v}")));
            }
        }
        if self.subsample.len() != 2 || self.subsample.iter().any(|&s| s <= 0) {
            return Err(QuicklookError::Validation(format!(
                "subsample must be two positive integers, got {:?}",
                self.subsample
            )));
        }
        if let Some(format) = &self.additional_format {
            if !format.eq_ignore_ascii_case("PNG") {
                return Err(QuicklookError::Validation(format!(
                    "unsupported additional format '{format}' (only PNG)"
                )));
            }
        }
        if !self.input.is_file() {
            return Err(QuicklookError::Validation(format!(
                "input file not found: {}",
                self.input.display()
            )));
        }
        Ok(())
    }

    /// Output (width, height) for an input of `width` x `height`.
    pub fn output_size(&self, width: usize, height: usize) -> (usize, usize) {
        let shrink = |n: usize, s: i64| -> usize {
            let s = s.max(1) as usize;
            let out = match self.subsample_mode {
                SubsampleMode::Percent => n * s / 100,
                SubsampleMode::Factor => n / s,
            };
            out.clamp(1, n.max(1))
        };
        let sx = self.subsample.first().copied().unwrap_or(100);
        let sy = self.subsample.get(1).copied().unwrap_or(sx);
        (shrink(width, sx), shrink(height, sy))
    }

    /// Attribute range with request overrides applied.
    fn resolve_range(&self, attr_range: Option<(f64, f64)>) -> Result<(f64, f64), QuicklookError> {
        if let Some(v) = self.src_min {
            info!(band = %self.band, src_min = v, "Overriding source minimum");
        }
        if let Some(v) = self.src_max {
            info!(band = %self.band, src_max = v, "Overriding source maximum");
        }
        let min = self.src_min.or(attr_range.map(|r| r.0));
        let max = self.src_max.or(attr_range.map(|r| r.1));
        match (min, max) {
            (Some(min), Some(max)) if max > min => Ok((min, max)),
            (Some(min), Some(max)) => Err(QuicklookError::Validation(format!(
                "degenerate source range [{min}, {max}] for band '{}'",
                self.band
            ))),
            _ => Err(QuicklookError::MissingRange(self.band.clone())),
        }
    }
}

/// Renders a byte-scaled, palette-coloured quicklook of one band.
pub fn generate_quicklook(request: &QuicklookRequest) -> Result<QuicklookOutput, QuicklookError> {
    request.validate()?;

    let file = netcdf::open(&request.input)?;
    let var = file
        .variable(&request.band)
        .ok_or_else(|| QuicklookError::MissingBand(request.band.clone()))?;
    let band = BandView::new(var).ok_or_else(|| {
        QuicklookError::Validation(format!("band '{}' is not two-dimensional", request.band))
    })?;

    let (src_min, src_max) = request.resolve_range(band.valid_range())?;
    let q = Quantization {
        src_min,
        src_max,
        src_nodata: band.nodata(),
        dst_min: request.ql_min as u8,
        dst_max: request.ql_max as u8,
        dst_nodata: request.ql_nodata as u8,
        mask_out_of_range: request.honour_valid_range,
    };

    let (out_w, out_h) = request.output_size(band.width, band.height);
    let rows = sample_indices(band.height, out_h);
    let cols = sample_indices(band.width, out_w);
    info!(
        band = %request.band,
        src = ?(src_min, src_max),
        dst = ?(q.dst_min, q.dst_max),
        width = out_w,
        height = out_h,
        "Generating quicklook"
    );

    let values = band.read_sampled(&rows, &cols)?;
    let mut pixels = quantize(&values, &q);

    if let Some(flag) = &request.qflag {
        apply_flag(&file, flag, &rows, &cols, (band.height, band.width), &mut pixels)?;
    }

    let lat = read_axis(&file, "lat").transpose()?;
    let lon = read_axis(&file, "lon").transpose()?;
    let grid = match (lat, lon) {
        (Some(lat), Some(lon)) if lat.len() == band.height && lon.len() == band.width => {
            GridInfo::from_axes(&lat, &lon, grid_projection(&file)?)
        }
        _ => {
            warn!("No usable lat/lon axes, writing pixel geometry");
            GridInfo {
                projection: String::new(),
                geo_transform: [0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
                width: band.width,
                height: band.height,
            }
        }
    }
    .resampled(out_w, out_h);

    let palette = match &request.color_table {
        Some(path) if path.is_file() => Some(Palette::load(path)?),
        Some(path) => {
            warn!(path = %path.display(), "Colour table not found, writing without palette");
            None
        }
        None => None,
    };

    let tiff = with_suffix(&request.output_stem, ".tiff");
    if let Some(parent) = tiff.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let ds = write_quicklook(pixels, &grid, &tiff, q.dst_nodata, palette.as_ref())?;

    let secondary = match &request.additional_format {
        Some(_) => {
            let png = with_suffix(&request.output_stem, ".png");
            write_copy(&ds, "PNG", &png)?;
            remove_aux_sidecar(&png);
            Some(png)
        }
        None => None,
    };
    drop(ds);
    remove_aux_sidecar(&tiff);

    info!(output = %tiff.display(), "Quicklook written");
    Ok(QuicklookOutput { tiff, secondary, width: out_w, height: out_h })
}

fn apply_flag(
    file: &netcdf::File,
    flag: &FlagOverride,
    rows: &[usize],
    cols: &[usize],
    shape: (usize, usize),
    pixels: &mut [u8],
) -> Result<(), QuicklookError> {
    let Some(flag_band) = file.variable(&flag.band).and_then(BandView::new) else {
        warn!(band = %flag.band, "Flag band missing, override skipped");
        return Ok(());
    };
    if (flag_band.height, flag_band.width) != shape {
        warn!(
            band = %flag.band,
            flag_shape = ?(flag_band.height, flag_band.width),
            data_shape = ?shape,
            "Flag band shape differs, override skipped"
        );
        return Ok(());
    }
    let flags = flag_band.read_sampled(rows, cols)?;
    apply_flag_override(pixels, &flags, flag.value, flag.replacement);
    Ok(())
}

fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut s = stem.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}
