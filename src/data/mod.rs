//! Observed-data ingest: remote case-count CSV and local annotations.

pub mod annotations;
pub mod cases;

pub use annotations::*;
pub use cases::*;
