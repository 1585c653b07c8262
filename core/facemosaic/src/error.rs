use thiserror::Error;

use crate::session::SessionState;

#[derive(Debug, Error)]
pub enum FaceMosaicError {
    #[error("failed to decode image: {0}")]
    DecodeError(String),

    #[error("image dimensions are zero")]
    ZeroDimensions,

    #[error("failed to encode image: {0}")]
    EncodeError(String),

    #[error("quality must be between 0.0 and 1.0, got {0}")]
    InvalidQuality(f32),

    #[error("brush radius must be between 1 and {max}, got {0}", max = crate::brush::MAX_RADIUS)]
    InvalidBrushRadius(u32),

    #[error("effect strength must be between 1 and {max}, got {0}", max = crate::brush::MAX_STRENGTH)]
    InvalidStrength(u32),

    #[error("pointer position ({x}, {y}) is not a finite number")]
    InvalidCoordinate { x: f64, y: f64 },

    #[error("no edit in progress (session is {0:?})")]
    NotEditing(SessionState),

    #[error("buffer size mismatch: expected {expected:?}, got {actual:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("sample array holds {actual} bytes, expected {expected}")]
    SampleLength { expected: usize, actual: usize },

    #[error("failed to load detector model: {0}")]
    ModelLoad(String),

    #[error("batch item {index} failed: {source}")]
    Item {
        index: usize,
        #[source]
        source: Box<FaceMosaicError>,
    },
}
