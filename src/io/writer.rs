// src/io/writer.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::ptr;

use gdal::errors::GdalError;
use gdal::raster::{Buffer, ColorEntry, ColorTable, PaletteInterpretation, RasterCreationOptions};
use gdal::{Dataset, DriverManager};
use tracing::{debug, warn};

use super::reader::GridInfo;
use crate::utils::palette::Palette;

/// Writes a single-band byte GeoTIFF with LZW compression, the given nodata
/// and an optional palette. Free-form metadata is cleared.
pub fn write_quicklook(
    data: Vec<u8>,
    grid: &GridInfo,
    output_path: &Path,
    nodata: u8,
    palette: Option<&Palette>,
) -> Result<Dataset, GdalError> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let creation_options = RasterCreationOptions::from_iter(["COMPRESS=LZW", "PROFILE=GeoTIFF"]);

    let mut out_ds = driver.create_with_band_type_with_options::<u8, _>(
        output_path,
        grid.width,
        grid.height,
        1,
        &creation_options,
    )?;

    out_ds.set_projection(&grid.projection)?;
    out_ds.set_geo_transform(&grid.geo_transform)?;

    {
        let mut band = out_ds.rasterband(1)?;
        band.set_no_data_value(Some(nodata as f64))?;

        if let Some(palette) = palette {
            band.set_color_table(&color_table(palette));
        }

        let mut buffer = Buffer::new((grid.width, grid.height), data);
        band.write((0, 0), (grid.width, grid.height), &mut buffer)?;
    }

    clear_metadata(&out_ds)?;
    out_ds.flush_cache()?;

    debug!(path = %output_path.display(), width = grid.width, height = grid.height, "Wrote quicklook");
    Ok(out_ds)
}

fn color_table(palette: &Palette) -> ColorTable {
    let mut ct = ColorTable::new(PaletteInterpretation::Rgba);
    for e in &palette.entries {
        if e.index > u16::MAX as usize {
            break;
        }
        ct.set_color_entry(
            e.index as u16,
            &ColorEntry::rgba(e.r as i16, e.g as i16, e.b as i16, e.a as i16),
        );
    }
    ct
}

/// Drops dataset and band metadata in the default domain.
fn clear_metadata(ds: &Dataset) -> Result<(), GdalError> {
    unsafe {
        let rv = gdal_sys::GDALSetMetadata(ds.c_dataset() as _, ptr::null_mut(), ptr::null());
        if rv != gdal_sys::CPLErr::CE_None {
            return Err(GdalError::CplError {
                class: rv,
                number: 0,
                msg: "GDALSetMetadata failed on dataset".to_string(),
            });
        }
        let band = ds.rasterband(1)?;
        let rv = gdal_sys::GDALSetMetadata(band.c_rasterband() as _, ptr::null_mut(), ptr::null());
        if rv != gdal_sys::CPLErr::CE_None {
            return Err(GdalError::CplError {
                class: rv,
                number: 0,
                msg: "GDALSetMetadata failed on band".to_string(),
            });
        }
    }
    Ok(())
}

/// Lossless copy of `source` through another GDAL driver.
pub fn write_copy(source: &Dataset, driver_name: &str, output_path: &Path) -> Result<(), GdalError> {
    let driver = DriverManager::get_driver_by_name(driver_name)?;
    let mut copy = source.create_copy(&driver, output_path, &RasterCreationOptions::new())?;
    copy.flush_cache()?;
    debug!(path = %output_path.display(), driver = driver_name, "Wrote secondary quicklook format");
    Ok(())
}

/// Removes the `.aux.xml` sidecar GDAL may leave next to `path`.
pub fn remove_aux_sidecar(path: &Path) {
    let mut sidecar = path.as_os_str().to_owned();
    sidecar.push(".aux.xml");
    let sidecar = PathBuf::from(sidecar);
    if sidecar.exists() {
        if let Err(e) = fs::remove_file(&sidecar) {
            warn!(path = %sidecar.display(), "Could not remove sidecar: {e}");
        }
    }
}
