//! Numeric helpers

mod math;

pub use math::*;
