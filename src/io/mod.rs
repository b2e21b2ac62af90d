// src/io/mod.rs
pub mod archive;
pub mod reader;
pub mod writer;

pub use archive::zip_directory;
pub use reader::{BandView, GridInfo};
pub use writer::write_quicklook;
