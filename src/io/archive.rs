// src/io/archive.rs
use std::fs::{self, File};
use std::io;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;

/// Zips every file under `source_dir` into `zip_path`, naming each entry
/// `prefix` + its path relative to `source_dir`. Returns the entry count.
pub fn zip_directory(source_dir: &Path, zip_path: &Path, prefix: &str) -> Result<usize, ArchiveError> {
    if !source_dir.is_dir() {
        return Err(ArchiveError::SourceNotFound(source_dir.to_path_buf()));
    }

    let file = File::create(zip_path)?;
    let mut zip = ZipWriter::new(file);
    let base_options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(source_dir).map_err(io::Error::other)?;
        let name = format!("{prefix}{}", entry_name(relative));

        let size = fs::metadata(path)?.len();
        let options = base_options.large_file(size >= 0xFFFF_FFFF);
        zip.start_file(name.as_str(), options)?;
        let mut f = File::open(path)?;
        io::copy(&mut f, &mut zip)?;
        debug!(entry = %name, size, "Added archive entry");
        count += 1;
    }

    zip.finish()?;
    Ok(count)
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
