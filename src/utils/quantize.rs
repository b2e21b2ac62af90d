// src/utils/quantize.rs
use rayon::prelude::*;

/// Source and destination ranges of the byte rescale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantization {
    pub src_min: f64,
    pub src_max: f64,
    pub src_nodata: Option<f64>,
    pub dst_min: u8,
    pub dst_max: u8,
    pub dst_nodata: u8,
    /// Values outside `[src_min, src_max]` become `dst_nodata` instead of clamping.
    pub mask_out_of_range: bool,
}

impl Quantization {
    /// Maps one source value to a byte.
    #[inline]
    pub fn apply(&self, value: f64) -> u8 {
        if value.is_nan() || self.src_nodata == Some(value) {
            return self.dst_nodata;
        }
        if self.mask_out_of_range && (value < self.src_min || value > self.src_max) {
            return self.dst_nodata;
        }
        let span = self.src_max - self.src_min;
        let scaled = (value - self.src_min) / span * (self.dst_max as f64 - self.dst_min as f64)
            + self.dst_min as f64;
        scaled.round().clamp(0.0, 255.0) as u8
    }
}

/// Rescales a buffer to bytes in parallel.
pub fn quantize(data: &[f64], q: &Quantization) -> Vec<u8> {
    let mut out = vec![0u8; data.len()];
    out.par_iter_mut()
        .zip(data.par_iter())
        .for_each(|(o, &v)| *o = q.apply(v));
    out
}

/// Replaces output pixels whose flag equals `value`. Applied after quantization.
pub fn apply_flag_override(out: &mut [u8], flags: &[f64], value: f64, replacement: u8) {
    out.par_iter_mut()
        .zip(flags.par_iter())
        .filter(|(_, f)| **f == value)
        .for_each(|(o, _)| *o = replacement);
}

/// Nearest-neighbour sample positions when shrinking `len` to `out_len`.
pub fn sample_indices(len: usize, out_len: usize) -> Vec<usize> {
    if out_len == 0 {
        return Vec::new();
    }
    let ratio = len as f64 / out_len as f64;
    (0..out_len)
        .map(|i| (((i as f64 + 0.5) * ratio).floor() as usize).min(len.saturating_sub(1)))
        .collect()
}

/// Picks `cols` out of each row of a row-major buffer.
pub fn subsample_columns<'a>(row: &'a [f64], cols: &'a [usize]) -> impl Iterator<Item = f64> + 'a {
    cols.iter().map(move |&c| row[c])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(src: (f64, f64), dst: (u8, u8), nodata: Option<f64>) -> Quantization {
        Quantization {
            src_min: src.0,
            src_max: src.1,
            src_nodata: nodata,
            dst_min: dst.0,
            dst_max: dst.1,
            dst_nodata: 255,
            mask_out_of_range: false,
        }
    }

    #[test]
    fn test_known_value() {
        assert_eq!(q((0.0, 250.0), (0, 210), None).apply(125.0), 105);
    }

    #[test]
    fn test_identity_on_bytes() {
        let q = q((0.0, 255.0), (0, 255), None);
        for v in 0..=255u8 {
            assert_eq!(q.apply(v as f64), v);
        }
    }

    #[test]
    fn test_clamped_and_nodata() {
        let q = q((0.0, 100.0), (0, 200), Some(-1.0));
        assert_eq!(q.apply(1000.0), 255);
        assert_eq!(q.apply(-50.0), 0);
        assert_eq!(q.apply(-1.0), 255);
        assert_eq!(q.apply(f64::NAN), 255);
    }

    #[test]
    fn test_out_of_range_masked() {
        // DMP-like: flags sit below the valid range
        let mut q = q((0.0, 32767.0), (0, 250), Some(-1.0));
        assert_eq!(q.apply(-2.0), 0);
        q.mask_out_of_range = true;
        assert_eq!(q.apply(-2.0), 255);
        assert_eq!(q.apply(40000.0), 255);
        assert_eq!(q.apply(0.0), 0);
        assert_eq!(q.apply(32767.0), 250);
    }

    #[test]
    fn test_subsample_columns() {
        let row = [10.0, 11.0, 12.0, 13.0];
        let picked: Vec<f64> = subsample_columns(&row, &[0, 2, 3]).collect();
        assert_eq!(picked, vec![10.0, 12.0, 13.0]);
    }

    #[test]
    fn test_flag_override() {
        let mut out = vec![1, 2, 3, 4];
        apply_flag_override(&mut out, &[0.0, 128.0, 5.0, 128.0], 128.0, 254);
        assert_eq!(out, vec![1, 254, 3, 254]);
    }

    #[test]
    fn test_sample_indices() {
        assert_eq!(sample_indices(10, 5), vec![1, 3, 5, 7, 9]);
        assert_eq!(sample_indices(3, 3), vec![0, 1, 2]);
        assert!(sample_indices(3, 0).is_empty());
    }
}
