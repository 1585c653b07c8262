use image::imageops;

use crate::error::FaceMosaicError;
use crate::face_detector::{DetectionResult, FaceBox, FaceDetector};
use crate::pixel_buffer::PixelBuffer;

/// Box-only face detector backed by the `rustface` crate (SeetaFace engine).
///
/// Produces no landmarks, so crops from this tier use the box-fraction
/// estimates. The SeetaFace frontal model is supplied by the caller.
pub struct RustfaceDetector {
    model: rustface::Model,
    min_face_size: u32,
}

impl RustfaceDetector {
    /// Load a SeetaFace model (e.g. `seeta_fd_frontal_v1.0.bin`).
    pub fn from_model_bytes(model_data: &[u8]) -> Result<Self, FaceMosaicError> {
        let model = rustface::read_model(std::io::Cursor::new(model_data))
            .map_err(|e| FaceMosaicError::ModelLoad(e.to_string()))?;
        Ok(Self {
            model,
            min_face_size: 20,
        })
    }

    /// Smallest face side length searched for, in pixels (default: 20).
    pub fn min_face_size(mut self, size: u32) -> Self {
        self.min_face_size = size;
        self
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&self, image: &PixelBuffer) -> Option<DetectionResult> {
        let gray = imageops::grayscale(&image.to_rgba_image());
        let (width, height) = gray.dimensions();

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.min_face_size);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));

        // Use the highest-scoring face
        let face = faces.iter().max_by(|a, b| {
            a.score()
                .partial_cmp(&b.score())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

        let bbox = face.bbox();
        Some(DetectionResult::from_box(
            FaceBox {
                x: bbox.x().max(0) as f64,
                y: bbox.y().max(0) as f64,
                width: bbox.width() as f64,
                height: bbox.height() as f64,
            },
            face.score(),
        ))
    }
}
