// src/processing/window.rs
use std::ops::Range;
use tracing::warn;

/// Half-open pixel window over the (lat, lon) axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub lat: Range<usize>,
    pub lon: Range<usize>,
}

impl Window {
    pub fn full(lat_len: usize, lon_len: usize) -> Self {
        Self { lat: 0..lat_len, lon: 0..lon_len }
    }

    pub fn height(&self) -> usize {
        self.lat.len()
    }

    pub fn width(&self) -> usize {
        self.lon.len()
    }
}

/// How the window is requested.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipRequest {
    /// Whole grid.
    Full,
    /// Coordinate bounds per axis; `None` keeps that axis whole.
    Bounds {
        lat: Option<(f64, f64)>,
        lon: Option<(f64, f64)>,
    },
    /// Upper-left coordinate plus pixel extent.
    Origin {
        lat: f64,
        lon: f64,
        width: usize,
        height: usize,
    },
}

/// Index of the axis value closest to `value`. First index wins on ties.
pub fn nearest_index(axis: &[f64], value: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, &v) in axis.iter().enumerate() {
        let dist = (v - value).abs();
        // NaN never compares less, so NaN coordinates are skipped
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

pub fn select_window(lat: &[f64], lon: &[f64], request: &ClipRequest) -> Window {
    match request {
        ClipRequest::Full => Window::full(lat.len(), lon.len()),
        ClipRequest::Bounds { lat: lat_bounds, lon: lon_bounds } => Window {
            lat: bounds_range(lat, *lat_bounds),
            lon: bounds_range(lon, *lon_bounds),
        },
        ClipRequest::Origin { lat: lat0, lon: lon0, width, height } => {
            let lat_start = nearest_index(lat, *lat0);
            // longitude start is shifted one pixel east of the nearest match
            let lon_start = (nearest_index(lon, *lon0) + 1).min(lon.len().saturating_sub(1));

            let lat_range = extent_range(lat_start, *height, lat.len());
            let lon_range = extent_range(lon_start, *width, lon.len());

            if lat_range.len() != *height || lon_range.len() != *width {
                warn!(
                    requested_width = *width,
                    requested_height = *height,
                    width = lon_range.len(),
                    height = lat_range.len(),
                    "Window size differs from the requested extent"
                );
            }

            Window { lat: lat_range, lon: lon_range }
        }
    }
}

fn bounds_range(axis: &[f64], bounds: Option<(f64, f64)>) -> Range<usize> {
    match bounds {
        None => 0..axis.len(),
        Some((b0, b1)) => {
            let start = nearest_index(axis, b0);
            let end = (nearest_index(axis, b1) + 1).min(axis.len());
            start.min(end)..start.max(end)
        }
    }
}

fn extent_range(start: usize, extent: usize, len: usize) -> Range<usize> {
    let end = (start + extent).min(len);
    let start = if end - start < extent {
        end.saturating_sub(extent)
    } else {
        start
    };
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(start: f64, step: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn test_nearest_index() {
        let a = axis(20.0, -0.5, 10);
        assert_eq!(nearest_index(&a, 20.0), 0);
        assert_eq!(nearest_index(&a, 18.6), 3);
        assert_eq!(nearest_index(&a, 100.0), 0);
        assert_eq!(nearest_index(&a, -100.0), 9);
    }

    #[test]
    fn test_nearest_index_skips_nan() {
        let a = vec![f64::NAN, 1.0, 2.0];
        assert_eq!(nearest_index(&a, 0.0), 1);
    }

    #[test]
    fn test_origin_window_exact() {
        let lat = axis(20.0, -0.01, 500);
        let lon = axis(-110.0, 0.01, 500);
        let req = ClipRequest::Origin { lat: 20.0, lon: -110.0, width: 100, height: 50 };
        let w = select_window(&lat, &lon, &req);
        assert_eq!(w.lat, 0..50);
        assert_eq!(w.lon, 1..101);
    }

    #[test]
    fn test_origin_window_clamped() {
        let lat = axis(20.0, -0.01, 80);
        let lon = axis(-110.0, 0.01, 60);
        let req = ClipRequest::Origin { lat: 19.5, lon: -109.8, width: 100, height: 100 };
        let w = select_window(&lat, &lon, &req);
        assert_eq!(w.lat, 0..80);
        assert_eq!(w.lon, 0..60);
    }

    #[test]
    fn test_origin_window_pulled_back() {
        let lat = axis(20.0, -0.01, 200);
        let lon = axis(-110.0, 0.01, 200);
        let req = ClipRequest::Origin { lat: 19.0, lon: -108.5, width: 100, height: 150 };
        let w = select_window(&lat, &lon, &req);
        assert_eq!(w.lat, 50..200);
        assert_eq!(w.lon, 100..200);
    }

    #[test]
    fn test_bounds_window_reversed() {
        let lat = axis(20.0, -1.0, 40);
        let lon = axis(-110.0, 1.0, 40);
        let req = ClipRequest::Bounds { lat: Some((0.0, 10.0)), lon: None };
        let w = select_window(&lat, &lon, &req);
        // nearest(0.0) = 20, nearest(10.0) + 1 = 11
        assert_eq!(w.lat, 11..20);
        assert_eq!(w.lon, 0..40);
    }

    #[test]
    fn test_full_window() {
        let w = select_window(&[1.0, 2.0], &[3.0, 4.0, 5.0], &ClipRequest::Full);
        assert_eq!(w, Window::full(2, 3));
        assert_eq!((w.height(), w.width()), (2, 3));
    }
}
