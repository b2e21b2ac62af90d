// src/processing/mod.rs
pub mod clip;
pub mod metadata;
pub mod pipeline;
pub mod products;
pub mod quicklook;
pub mod window;

// Re-export main components
pub use clip::{clip_variables, ClipOptions};
pub use metadata::{fill_template, render_template, substitute_tokens, Bom, Substitutions};
pub use pipeline::{PipelineSettings, ProductPipeline};
pub use products::{Product, Region};
pub use quicklook::{generate_quicklook, QuicklookRequest};
pub use window::{nearest_index, select_window, ClipRequest, Window};
