// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while cropping a NetCDF file to a regional window.
#[derive(Debug, Error)]
pub enum ClipError {
    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("missing coordinate variable '{0}'")]
    MissingCoordinate(&'static str),

    #[error("variable '{name}' has unsupported type {kind}")]
    UnsupportedType { name: String, kind: String },

    #[error("netcdf error while {context}: {source}")]
    NetCdf {
        context: String,
        #[source]
        source: netcdf::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClipError {
    pub(crate) fn netcdf(context: impl Into<String>) -> impl FnOnce(netcdf::Error) -> Self {
        let context = context.into();
        move |source| ClipError::NetCdf { context, source }
    }
}

/// Errors raised while generating a byte quicklook.
#[derive(Debug, Error)]
pub enum QuicklookError {
    #[error("{0}")]
    Validation(String),

    #[error("no source value range for band '{0}' (no valid_range and no override)")]
    MissingRange(String),

    #[error("band '{0}' not found")]
    MissingBand(String),

    #[error("netcdf error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("gdal error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuicklookError {
    /// Short machine-readable category, logged alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            QuicklookError::Validation(_) => "ValueError",
            QuicklookError::MissingRange(_) => "RangeError",
            QuicklookError::MissingBand(_) => "KeyError",
            QuicklookError::NetCdf(_) | QuicklookError::Gdal(_) => "LibraryError",
            QuicklookError::Io(_) => "IOError",
        }
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(PathBuf),

    #[error("template is empty: {0}")]
    Empty(PathBuf),

    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed template at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("failed to write document: {0}")]
    Write(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("source directory not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of one product/region pipeline unit.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unexpected source file name '{0}'")]
    SourceName(String),

    #[error("clip failed: {0}")]
    Clip(#[from] ClipError),

    #[error("quicklook failed ({kind}): {0}", kind = .0.kind())]
    Quicklook(#[from] QuicklookError),

    #[error("metadata failed: {0}")]
    Template(#[from] TemplateError),

    #[error("packaging failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
