use std::collections::BTreeMap;

use crate::pixel_buffer::PixelBuffer;

/// Default minimum confidence accepted by a [`DetectorChain`].
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.15;

/// Axis-aligned bounding box of a detected face, in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    /// X coordinate of the top-left corner (pixels).
    pub x: f64,
    /// Y coordinate of the top-left corner (pixels).
    pub y: f64,
    /// Width of the bounding box (pixels).
    pub width: f64,
    /// Height of the bounding box (pixels).
    pub height: f64,
}

impl FaceBox {
    /// Horizontal center of the box.
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

/// A point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Named facial landmark produced by higher-precision detector tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Landmark {
    LeftEye,
    RightEye,
    /// Top of the nose between the eyes; the crop never starts above it.
    NoseBridge,
    NoseTip,
    /// Lower edge of the lower lip; the crop's preferred top edge.
    LowerLip,
    Chin,
}

/// Output of a face detector for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub face: FaceBox,
    /// Present only when the detector tier produced landmark points.
    pub landmarks: Option<BTreeMap<Landmark, Point>>,
    /// Detection confidence score.
    pub confidence: f64,
}

impl DetectionResult {
    /// A box-only result.
    pub fn from_box(face: FaceBox, confidence: f64) -> Self {
        Self {
            face,
            landmarks: None,
            confidence,
        }
    }

    /// Attach landmark points.
    pub fn with_landmarks(mut self, landmarks: BTreeMap<Landmark, Point>) -> Self {
        self.landmarks = Some(landmarks);
        self
    }

    /// Position of a landmark, if this result carries it.
    pub fn landmark(&self, kind: Landmark) -> Option<Point> {
        self.landmarks.as_ref()?.get(&kind).copied()
    }
}

/// Pluggable face detection backend.
///
/// Implement this trait to provide a face detector (ONNX, dlib, a browser
/// model, etc.). Detectors report at most one face per image.
pub trait FaceDetector {
    /// Detect the most prominent face in an RGBA buffer.
    fn detect(&self, image: &PixelBuffer) -> Option<DetectionResult>;
}

impl<D: FaceDetector + ?Sized> FaceDetector for Box<D> {
    fn detect(&self, image: &PixelBuffer) -> Option<DetectionResult> {
        (**self).detect(image)
    }
}

/// Ordered list of detector tiers, most precise first.
///
/// Each tier is tried in turn until one returns a result whose confidence
/// reaches `min_confidence`. Downstream code only ever sees that single
/// result.
pub struct DetectorChain {
    tiers: Vec<Box<dyn FaceDetector>>,
    min_confidence: f64,
}

impl Default for DetectorChain {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorChain {
    pub fn new() -> Self {
        Self {
            tiers: Vec::new(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    /// Append a tier. Tiers run in insertion order.
    pub fn tier(mut self, detector: Box<dyn FaceDetector>) -> Self {
        self.tiers.push(detector);
        self
    }

    /// Set the minimum accepted confidence (default: 0.15).
    pub fn min_confidence(mut self, threshold: f64) -> Self {
        self.min_confidence = threshold;
        self
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl FaceDetector for DetectorChain {
    fn detect(&self, image: &PixelBuffer) -> Option<DetectionResult> {
        for (tier, detector) in self.tiers.iter().enumerate() {
            match detector.detect(image) {
                Some(result) if result.confidence >= self.min_confidence => {
                    log::debug!("detector tier {tier} found a face ({:.2})", result.confidence);
                    return Some(result);
                }
                Some(result) => {
                    log::debug!(
                        "detector tier {tier} below threshold ({:.2} < {:.2})",
                        result.confidence,
                        self.min_confidence
                    );
                }
                None => log::debug!("detector tier {tier} found no face"),
            }
        }
        None
    }
}
