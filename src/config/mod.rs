//! Fixed capacities and framing sizes shared across the engine.

mod constants;

pub use constants::*;
