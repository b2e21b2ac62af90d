// src/processing/clip.rs
use std::fs;
use std::ops::Range;
use std::path::Path;

use chrono::NaiveDate;
use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::{AttributeValue, Extents, FileMut, NcTypeDescriptor, Variable};
use tracing::{debug, info, warn};

use super::window::{select_window, ClipRequest, Window};
use crate::error::ClipError;
use crate::io::reader::{hyperslab, read_axis};

pub const DEFAULT_CHUNK: usize = 1920;

/// Coordinate and auxiliary variables that always travel with the clip.
const SLICED_COORDINATES: [&str; 2] = ["lat", "lon"];
const FULL_AUXILIARIES: [&str; 2] = ["time", "crs"];

#[derive(Debug, Clone)]
pub struct ClipOptions {
    pub request: ClipRequest,
    pub variables: Vec<String>,
    pub identifier: Option<String>,
    pub parent_identifier: Option<String>,
    /// Replaces `GLOBE` in the title, e.g. `SOAM`.
    pub region_code: String,
    /// Appended to the history line, e.g. `South-America`.
    pub region_name: String,
    /// Deflate level 0-9; `None` writes uncompressed.
    pub compress_level: Option<i32>,
    pub default_chunk: usize,
    pub chunk_overrides: Vec<(String, usize)>,
    pub history_date: NaiveDate,
}

impl ClipOptions {
    pub fn new(request: ClipRequest, variables: Vec<String>) -> Self {
        Self {
            request,
            variables,
            identifier: None,
            parent_identifier: None,
            region_code: String::new(),
            region_name: String::new(),
            compress_level: Some(9),
            default_chunk: DEFAULT_CHUNK,
            chunk_overrides: Vec::new(),
            history_date: chrono::Local::now().date_naive(),
        }
    }

    fn chunk_for(&self, var: &str) -> usize {
        self.chunk_overrides
            .iter()
            .find(|(name, _)| name == var)
            .map(|(_, c)| *c)
            .unwrap_or(self.default_chunk)
            .max(1)
    }
}

/// Crops the requested variables of `src` to the selected window and writes
/// them to `dst`. On failure no output file is left behind.
pub fn clip_variables(src: &Path, dst: &Path, opts: &ClipOptions) -> Result<Window, ClipError> {
    if !src.is_file() {
        return Err(ClipError::InputNotFound(src.to_path_buf()));
    }

    let result = clip_into(src, dst, opts);
    if result.is_err() && dst.exists() {
        if let Err(e) = fs::remove_file(dst) {
            warn!(path = %dst.display(), "Could not remove partial output: {e}");
        }
    }
    result
}

fn clip_into(src: &Path, dst: &Path, opts: &ClipOptions) -> Result<Window, ClipError> {
    let input = netcdf::open(src).map_err(ClipError::netcdf(format!("opening {}", src.display())))?;

    let lat = read_axis(&input, "lat")
        .ok_or(ClipError::MissingCoordinate("lat"))?
        .map_err(ClipError::netcdf("reading lat"))?;
    let lon = read_axis(&input, "lon")
        .ok_or(ClipError::MissingCoordinate("lon"))?
        .map_err(ClipError::netcdf("reading lon"))?;

    let window = select_window(&lat, &lon, &opts.request);
    info!(
        lat = ?window.lat,
        lon = ?window.lon,
        width = window.width(),
        height = window.height(),
        "Selected clip window"
    );

    let mut out = netcdf::create(dst).map_err(ClipError::netcdf(format!("creating {}", dst.display())))?;
    copy_global_attributes(&input, &mut out, opts)?;

    for name in SLICED_COORDINATES {
        if let Some(var) = input.variable(name) {
            copy_variable(&var, &mut out, &window, None)?;
        }
    }
    for name in FULL_AUXILIARIES {
        if let Some(var) = input.variable(name) {
            copy_variable(&var, &mut out, &window, None)?;
        }
    }

    for name in &opts.variables {
        let Some(var) = input.variable(name) else {
            warn!(variable = %name, "Variable not in source, skipping");
            continue;
        };
        let layout = DataLayout { chunk: opts.chunk_for(name), compress_level: opts.compress_level };
        copy_variable(&var, &mut out, &window, Some(layout))?;
        debug!(variable = %name, "Copied variable");
    }

    // closes and flushes the output
    drop(out);
    Ok(window)
}

fn copy_global_attributes(input: &netcdf::File, out: &mut FileMut, opts: &ClipOptions) -> Result<(), ClipError> {
    let mut history = None;
    let mut title = None;

    for attr in input.attributes() {
        let value = attr.value().map_err(ClipError::netcdf(format!("reading global attribute {}", attr.name())))?;
        match attr.name() {
            "history" => history = Some(value_as_string(&value)),
            "title" => title = Some(value_as_string(&value)),
            _ => {}
        }
        out.add_attribute(attr.name(), value)
            .map_err(ClipError::netcdf(format!("writing global attribute {}", attr.name())))?;
    }

    if let Some(identifier) = &opts.identifier {
        out.add_attribute("identifier", identifier.as_str())
            .map_err(ClipError::netcdf("writing identifier"))?;
    }
    if let Some(parent) = &opts.parent_identifier {
        out.add_attribute("parent_identifier", parent.as_str())
            .map_err(ClipError::netcdf("writing parent_identifier"))?;
    }
    if let Some(title) = title {
        if !opts.region_code.is_empty() {
            out.add_attribute("title", title.replace("GLOBE", &opts.region_code))
                .map_err(ClipError::netcdf("writing title"))?;
        }
    }

    let line = format!(
        "{}: CLMS Clipping tool for {}",
        opts.history_date.format("%Y-%m-%d"),
        opts.region_name
    );
    let history = match history {
        Some(h) => format!("{h} \n{line}"),
        None => line,
    };
    out.add_attribute("history", history).map_err(ClipError::netcdf("writing history"))?;
    Ok(())
}

fn value_as_string(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Str(s) => s.clone(),
        AttributeValue::Strs(v) => v.join(""),
        other => format!("{other:?}"),
    }
}

/// Chunking and compression for data variables.
#[derive(Debug, Clone, Copy)]
struct DataLayout {
    chunk: usize,
    compress_level: Option<i32>,
}

/// Per-dimension plan: source range and output dimension length.
struct Plan {
    dims: Vec<String>,
    ranges: Vec<Range<usize>>,
    lat_axis: Option<usize>,
}

impl Plan {
    fn new(var: &Variable, window: &Window) -> Self {
        let mut dims = Vec::new();
        let mut ranges = Vec::new();
        let mut lat_axis = None;
        for (i, dim) in var.dimensions().iter().enumerate() {
            let name = dim.name();
            let range = match name.as_str() {
                "lat" => {
                    lat_axis = Some(i);
                    window.lat.clone()
                }
                "lon" => window.lon.clone(),
                _ => 0..dim.len(),
            };
            dims.push(name);
            ranges.push(range);
        }
        Self { dims, ranges, lat_axis }
    }

    fn chunking(&self, chunk: usize) -> Option<Vec<usize>> {
        if self.ranges.iter().any(|r| r.is_empty()) || self.dims.is_empty() {
            return None;
        }
        Some(
            self.dims
                .iter()
                .zip(&self.ranges)
                .map(|(name, r)| match name.as_str() {
                    "lat" | "lon" => chunk.min(r.len()),
                    "time" => 1,
                    _ => r.len(),
                })
                .collect(),
        )
    }
}

fn ensure_dimensions(out: &mut FileMut, plan: &Plan) -> Result<(), ClipError> {
    for (name, range) in plan.dims.iter().zip(&plan.ranges) {
        if out.dimension(name).is_none() {
            out.add_dimension(name, range.len())
                .map_err(ClipError::netcdf(format!("adding dimension {name}")))?;
        }
    }
    Ok(())
}

fn copy_variable(var: &Variable, out: &mut FileMut, window: &Window, layout: Option<DataLayout>) -> Result<(), ClipError> {
    let plan = Plan::new(var, window);
    ensure_dimensions(out, &plan)?;

    match var.vartype() {
        NcVariableType::Int(IntType::U8) => copy_typed::<u8>(var, out, &plan, layout),
        NcVariableType::Int(IntType::I8) => copy_typed::<i8>(var, out, &plan, layout),
        NcVariableType::Int(IntType::U16) => copy_typed::<u16>(var, out, &plan, layout),
        NcVariableType::Int(IntType::I16) => copy_typed::<i16>(var, out, &plan, layout),
        NcVariableType::Int(IntType::U32) => copy_typed::<u32>(var, out, &plan, layout),
        NcVariableType::Int(IntType::I32) => copy_typed::<i32>(var, out, &plan, layout),
        NcVariableType::Int(IntType::U64) => copy_typed::<u64>(var, out, &plan, layout),
        NcVariableType::Int(IntType::I64) => copy_typed::<i64>(var, out, &plan, layout),
        NcVariableType::Float(FloatType::F32) => copy_typed::<f32>(var, out, &plan, layout),
        NcVariableType::Float(FloatType::F64) => copy_typed::<f64>(var, out, &plan, layout),
        NcVariableType::Char => copy_char(var, out, &plan),
        other => Err(ClipError::UnsupportedType { name: var.name(), kind: format!("{other:?}") }),
    }
}

fn copy_typed<T>(var: &Variable, out: &mut FileMut, plan: &Plan, layout: Option<DataLayout>) -> Result<(), ClipError>
where
    T: NcTypeDescriptor + Copy,
{
    let name = var.name();
    let dims: Vec<&str> = plan.dims.iter().map(String::as_str).collect();
    let mut out_var = out
        .add_variable::<T>(&name, &dims)
        .map_err(ClipError::netcdf(format!("creating {name}")))?;

    let mut strip = plan.ranges.get(plan.lat_axis.unwrap_or(0)).map_or(1, |r| r.len().max(1));
    if let Some(layout) = layout {
        if let Some(chunks) = plan.chunking(layout.chunk) {
            out_var
                .set_chunking(&chunks)
                .map_err(ClipError::netcdf(format!("chunking {name}")))?;
            if let Some(i) = plan.lat_axis {
                strip = chunks[i];
            }
        }
        if let Some(level) = layout.compress_level {
            out_var
                .set_compression(level.clamp(0, 9), true)
                .map_err(ClipError::netcdf(format!("compressing {name}")))?;
        }
    }

    for attr in var.attributes() {
        let value = attr.value().map_err(ClipError::netcdf(format!("reading {name}:{}", attr.name())))?;
        out_var
            .put_attribute(attr.name(), value)
            .map_err(ClipError::netcdf(format!("writing {name}:{}", attr.name())))?;
    }

    if plan.ranges.iter().any(|r| r.is_empty()) {
        return Ok(());
    }

    // Scalars and variables without a lat axis are copied in one piece.
    let Some(lat_axis) = plan.lat_axis else {
        let (src, dst) = if plan.ranges.is_empty() {
            (Extents::All, Extents::All)
        } else {
            let full: Vec<Range<usize>> = plan.ranges.iter().map(|r| 0..r.len()).collect();
            (hyperslab(&plan.ranges), hyperslab(&full))
        };
        let data = var
            .get_values::<T, _>(src)
            .map_err(ClipError::netcdf(format!("reading {name}")))?;
        out_var
            .put_values(&data, dst)
            .map_err(ClipError::netcdf(format!("writing {name}")))?;
        return Ok(());
    };

    let lat_range = plan.ranges[lat_axis].clone();
    let mut offset = 0;
    while offset < lat_range.len() {
        let rows = strip.min(lat_range.len() - offset);

        let mut src = plan.ranges.clone();
        src[lat_axis] = lat_range.start + offset..lat_range.start + offset + rows;
        let mut dst: Vec<Range<usize>> = plan.ranges.iter().map(|r| 0..r.len()).collect();
        dst[lat_axis] = offset..offset + rows;

        let data = var
            .get_values::<T, _>(hyperslab(&src))
            .map_err(ClipError::netcdf(format!("reading {name} rows {:?}", src[lat_axis])))?;
        out_var
            .put_values(&data, hyperslab(&dst))
            .map_err(ClipError::netcdf(format!("writing {name} rows {:?}", dst[lat_axis])))?;

        offset += rows;
    }
    Ok(())
}

/// Character variables (typically the `crs` grid mapping) carry their meaning
/// in attributes; they are recreated with attributes and left at fill value.
fn copy_char(var: &Variable, out: &mut FileMut, plan: &Plan) -> Result<(), ClipError> {
    let name = var.name();
    let dims: Vec<&str> = plan.dims.iter().map(String::as_str).collect();
    let mut out_var = out
        .add_variable_with_type(&name, &dims, &NcVariableType::Char)
        .map_err(ClipError::netcdf(format!("creating {name}")))?;
    for attr in var.attributes() {
        let value = attr.value().map_err(ClipError::netcdf(format!("reading {name}:{}", attr.name())))?;
        out_var
            .put_attribute(attr.name(), value)
            .map_err(ClipError::netcdf(format!("writing {name}:{}", attr.name())))?;
    }
    Ok(())
}
