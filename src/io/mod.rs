//! File input/output: results CSV export and model JSON files.

pub mod export;
pub mod model_file;

pub use export::*;
pub use model_file::*;
