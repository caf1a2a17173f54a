//! Compartmental epidemic models.

pub mod sir;

pub use sir::*;
