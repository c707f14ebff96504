//! Schema module - Run configuration, metadata sidecar and color catalog.

mod config;
mod metadata;
mod palette;

pub use config::*;
pub use metadata::*;
pub use palette::*;
