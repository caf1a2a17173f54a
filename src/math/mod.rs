//! Numerical utilities: the adaptive implicit ODE solver with dense output.

pub mod ode;

pub use ode::*;
