use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeightfieldError {
    #[error("Level {level} exceeds the maximum supported level {max}")]
    LevelTooLarge { level: u32, max: u32 },

    #[error("Span {span} does not match level {level} (expected {expected})")]
    SpanMismatch {
        span: usize,
        level: u32,
        expected: usize,
    },

    #[error("Corner {corner} is not a finite number: {value}")]
    NonFiniteCorner { corner: &'static str, value: f64 },

    #[error("Invalid roughness: {0} (must be finite and non-negative)")]
    InvalidRoughness(f64),

    #[error("Invalid render scale: {0} (must be at least 1 and keep the image within the size limit)")]
    InvalidScale(u32),

    #[error("Cell ({x}, {y}) was never assigned")]
    UnsetCell { x: usize, y: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
