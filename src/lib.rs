//! Diamond-Square heightfield generation.
//!
//! Re-exports modules for use by the CLI and other consumers.

pub mod config;
pub mod error;
pub mod generator;
pub mod grid;
pub mod offsets;
pub mod renderer;

pub use config::HeightfieldConfig;
pub use error::HeightfieldError;
pub use generator::{GenerationSettings, HeightfieldGenerator, MAX_LEVEL};
pub use grid::{Corners, HeightGrid, Heightfield};
pub use offsets::{FixedOffset, OffsetSource, RandomOffsets};
pub use renderer::HeightfieldRenderer;
