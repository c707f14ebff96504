//! Compute module - Frame planning, color selection and intensity mapping.

mod color;
mod frames;
mod intensity;

pub use color::*;
pub use frames::*;
pub use intensity::*;
