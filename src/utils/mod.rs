// src/utils/mod.rs
pub mod ledger;
pub mod palette;
pub mod quantize;

pub use ledger::Ledger;
pub use palette::Palette;
pub use quantize::Quantization;
