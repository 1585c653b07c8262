//! Photo redaction: paint pixelation or blur over sensitive regions, then
//! export the original, the redacted image and a face-aware square crop.
//!
//! # Example
//!
//! ```no_run
//! use facemosaic::{Batch, ExportOptions, FailurePolicy, SessionConfig};
//!
//! let inputs = vec![std::fs::read("photo.jpg").unwrap()];
//! let mut batch = Batch::prepare(
//!     &inputs,
//!     None,
//!     &SessionConfig::default(),
//!     FailurePolicy::Abort,
//!     |p| println!("{}%", p.percent()),
//! )
//! .unwrap();
//!
//! let session = batch.session_mut(0).unwrap();
//! session.open();
//! session.begin_stroke(120.0, 80.0).unwrap();
//! session.stroke_to(220.0, 90.0).unwrap();
//! session.end_stroke().unwrap();
//! session.commit().unwrap();
//!
//! let sets = batch.export(&ExportOptions::default(), |_| {}).unwrap();
//! println!("{} bytes", sets[0].cropped.data.len());
//! ```

mod batch;
mod brush;
mod compositor;
mod crop;
mod encode;
mod error;
/// Face detection traits and data types.
pub mod face_detector;
mod history;
mod pixel_buffer;
#[cfg(feature = "rustface")]
/// SeetaFace-based face detector tier.
pub mod rustface_backend;
mod session;

pub use batch::{Batch, FailurePolicy, ItemFailure, Progress};
pub use brush::{Brush, BrushMode, DEFAULT_RADIUS, DEFAULT_STRENGTH, MAX_RADIUS, MAX_STRENGTH};
pub use compositor::{dab_centers, StrokeCompositor};
pub use crop::{resolve_crop, CropConfig, CropRect};
pub use encode::{
    decode_image, encode_buffer, EncodedImage, ExportFormat, ExportOptions, ExportedSet,
};
/// Error type returned by facemosaic operations.
pub use error::FaceMosaicError;
pub use face_detector::{DetectionResult, DetectorChain, FaceBox, FaceDetector, Landmark, Point};
pub use history::{HistoryStack, DEFAULT_HISTORY_DEPTH};
pub use pixel_buffer::PixelBuffer;
#[cfg(feature = "rustface")]
pub use rustface_backend::RustfaceDetector;
pub use session::{EditSession, SessionConfig, SessionState};
