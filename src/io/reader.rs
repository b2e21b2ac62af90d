// src/io/reader.rs
use std::ops::Range;

use gdal::spatial_ref::SpatialRef;
use netcdf::{AttributeValue, Extent, Extents, Variable};

/// Step of the global 300 m grid in degrees, used when an axis has a single sample.
const DEFAULT_STEP: f64 = 1.0 / 336.0;

/// Georeferencing of a (lat, lon) grid, in GDAL terms.
#[derive(Debug, Clone)]
pub struct GridInfo {
    pub projection: String,
    pub geo_transform: [f64; 6],
    pub width: usize,
    pub height: usize,
}

impl GridInfo {
    /// Builds the geotransform from pixel-centre coordinates.
    pub fn from_axes(lat: &[f64], lon: &[f64], projection: String) -> Self {
        let dx = axis_step(lon).unwrap_or(DEFAULT_STEP);
        let dy = axis_step(lat).unwrap_or(-DEFAULT_STEP);
        let x0 = lon.first().copied().unwrap_or(0.0) - dx / 2.0;
        let y0 = lat.first().copied().unwrap_or(0.0) - dy / 2.0;
        Self {
            projection,
            geo_transform: [x0, dx, 0.0, y0, 0.0, dy],
            width: lon.len(),
            height: lat.len(),
        }
    }

    /// Same grid after nearest-neighbour resampling to `width` x `height`.
    pub fn resampled(&self, width: usize, height: usize) -> Self {
        let mut gt = self.geo_transform;
        if width > 0 {
            gt[1] *= self.width as f64 / width as f64;
        }
        if height > 0 {
            gt[5] *= self.height as f64 / height as f64;
        }
        Self { projection: self.projection.clone(), geo_transform: gt, width, height }
    }
}

fn axis_step(axis: &[f64]) -> Option<f64> {
    match axis {
        [first, .., last] => Some((last - first) / (axis.len() - 1) as f64),
        _ => None,
    }
}

/// Extents selecting `ranges` along each dimension.
pub fn hyperslab(ranges: &[Range<usize>]) -> Extents {
    Extents::from(ranges.iter().cloned().map(Extent::from).collect::<Vec<_>>())
}

/// Reads a whole 1-D coordinate variable as f64.
pub fn read_axis(file: &netcdf::File, name: &str) -> Option<Result<Vec<f64>, netcdf::Error>> {
    file.variable(name).map(|var| var.get_values::<f64, _>(..))
}

/// WKT of the `crs` grid mapping, or geographic WGS84 when absent.
pub fn grid_projection(file: &netcdf::File) -> Result<String, gdal::errors::GdalError> {
    if let Some(crs) = file.variable("crs") {
        for key in ["spatial_ref", "crs_wkt"] {
            if let Some(wkt) = attr_string(&crs, key) {
                if !wkt.trim().is_empty() {
                    return Ok(wkt);
                }
            }
        }
    }
    SpatialRef::from_epsg(4326)?.to_wkt()
}

pub fn attr_string(var: &Variable, name: &str) -> Option<String> {
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(v) => Some(v.join("")),
        _ => None,
    }
}

/// Numeric attribute values widened to f64. Strings like `"{0,250}"` are parsed too.
pub fn attr_numbers(var: &Variable, name: &str) -> Option<Vec<f64>> {
    let value = var.attribute_value(name)?.ok()?;
    Some(match value {
        AttributeValue::Uchar(v) => vec![v as f64],
        AttributeValue::Uchars(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Schar(v) => vec![v as f64],
        AttributeValue::Schars(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Ushort(v) => vec![v as f64],
        AttributeValue::Ushorts(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Short(v) => vec![v as f64],
        AttributeValue::Shorts(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Uint(v) => vec![v as f64],
        AttributeValue::Uints(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Int(v) => vec![v as f64],
        AttributeValue::Ints(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Ulonglong(v) => vec![v as f64],
        AttributeValue::Ulonglongs(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Longlong(v) => vec![v as f64],
        AttributeValue::Longlongs(v) => v.into_iter().map(|x| x as f64).collect(),
        AttributeValue::Float(v) => vec![v as f64],
        AttributeValue::Floats(v) => v.into_iter().map(f64::from).collect(),
        AttributeValue::Double(v) => vec![v],
        AttributeValue::Doubles(v) => v,
        AttributeValue::Str(s) => parse_number_list(&s),
        AttributeValue::Strs(v) => parse_number_list(&v.join(",")),
        #[allow(unreachable_patterns)]
        _ => return None,
    })
}

fn parse_number_list(s: &str) -> Vec<f64> {
    s.split(|c: char| c == ',' || c.is_whitespace() || c == '{' || c == '}' || c == '[' || c == ']')
        .filter_map(|t| t.trim().parse::<f64>().ok())
        .collect()
}

/// A data variable viewed as a 2-D (lat, lon) band. Leading dimensions such
/// as `time` are pinned to index 0.
pub struct BandView<'f> {
    pub var: Variable<'f>,
    leading: usize,
    pub height: usize,
    pub width: usize,
}

impl<'f> BandView<'f> {
    pub fn new(var: Variable<'f>) -> Option<Self> {
        let dims = var.dimensions();
        if dims.len() < 2 {
            return None;
        }
        let height = dims[dims.len() - 2].len();
        let width = dims[dims.len() - 1].len();
        let leading = dims.len() - 2;
        Some(Self { var, leading, height, width })
    }

    pub fn read_row(&self, row: usize) -> Result<Vec<f64>, netcdf::Error> {
        let mut ranges = vec![0..1; self.leading];
        ranges.push(row..row + 1);
        ranges.push(0..self.width);
        self.var.get_values::<f64, _>(hyperslab(&ranges))
    }

    /// Rows at `rows`, each reduced to the columns at `cols`, flattened row-major.
    pub fn read_sampled(&self, rows: &[usize], cols: &[usize]) -> Result<Vec<f64>, netcdf::Error> {
        let mut out = Vec::with_capacity(rows.len() * cols.len());
        for &r in rows {
            let row = self.read_row(r)?;
            out.extend(crate::utils::quantize::subsample_columns(&row, cols));
        }
        Ok(out)
    }

    /// `_FillValue`, falling back to `missing_value`.
    pub fn nodata(&self) -> Option<f64> {
        ["_FillValue", "missing_value"]
            .iter()
            .find_map(|k| attr_numbers(&self.var, k).and_then(|v| v.first().copied()))
    }

    /// `valid_range`, falling back to `valid_min`/`valid_max`.
    pub fn valid_range(&self) -> Option<(f64, f64)> {
        if let Some(v) = attr_numbers(&self.var, "valid_range") {
            if v.len() >= 2 {
                return Some((v[0], v[1]));
            }
        }
        let min = attr_numbers(&self.var, "valid_min")?.first().copied()?;
        let max = attr_numbers(&self.var, "valid_max")?.first().copied()?;
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_transform_from_centres() {
        let lat = [20.0, 19.5, 19.0];
        let lon = [-110.0, -109.5, -109.0, -108.5];
        let g = GridInfo::from_axes(&lat, &lon, String::new());
        assert_eq!(g.geo_transform, [-110.25, 0.5, 0.0, 20.25, 0.0, -0.5]);
        assert_eq!((g.width, g.height), (4, 3));

        let r = g.resampled(2, 1);
        assert_eq!(r.geo_transform[1], 1.0);
        assert_eq!(r.geo_transform[5], -1.5);
    }

    #[test]
    fn test_parse_number_list() {
        assert_eq!(parse_number_list("{0, 250}"), vec![0.0, 250.0]);
        assert_eq!(parse_number_list("[1 2]"), vec![1.0, 2.0]);
    }
}
