use crate::face_detector::{DetectionResult, Landmark};

/// Square crop region within the source image.
///
/// Produced by [`resolve_crop`], which guarantees `left + size <= width`,
/// `top + size <= height` and `size >= 1` for any non-empty image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub size: u32,
}

/// Geometry used to turn a detection into a crop.
#[derive(Debug, Clone, PartialEq)]
pub struct CropConfig {
    /// Square size used for the center crop when no face was found.
    pub reference_size: u32,
    /// Floor applied to face-based crop sizes.
    pub min_size: u32,
    /// Landscape crop size as a fraction of image height.
    pub landscape_ratio: f64,
    /// Portrait (and square) crop size as a fraction of image width.
    pub portrait_ratio: f64,
    /// Estimated lower-lip position, as a fraction of the face box height.
    pub anchor_fraction: f64,
    /// Estimated nose-bridge position, as a fraction of the face box height.
    pub limit_fraction: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            reference_size: 1000,
            min_size: 300,
            landscape_ratio: 0.8,
            portrait_ratio: 0.5,
            anchor_fraction: 0.75,
            limit_fraction: 0.55,
        }
    }
}

/// Resolve the export crop for a `width` × `height` image.
///
/// Fallback ladder:
/// 1. no detection: center crop of `min(reference_size, width, height)`;
/// 2. detection with lower-lip and nose-bridge landmarks: crop starts at the
///    lip, centered on the face, never pulled above the nose bridge;
/// 3. box-only detection (or landmarks missing either point): same framing
///    with both points estimated from the box height.
///
/// The result is always clamped into the image. Clamping wins over the size
/// floor, so a crop held below the nose bridge in a short image can end up
/// smaller than `min_size`. A zero-sized image yields a zero-sized crop.
pub fn resolve_crop(
    width: u32,
    height: u32,
    detection: Option<&DetectionResult>,
    config: &CropConfig,
) -> CropRect {
    if width == 0 || height == 0 {
        return CropRect {
            left: 0,
            top: 0,
            size: 0,
        };
    }

    let (left, top, size) = match detection {
        None => center_crop(width, height, config),
        Some(detection) => face_crop(width, height, detection, config),
    };
    fit(left, top, size, width, height)
}

fn center_crop(width: u32, height: u32, config: &CropConfig) -> (i64, i64, i64) {
    let size = config.reference_size.min(width).min(height) as i64;
    let left = (width as i64 - size) / 2;
    let top = (height as i64 - size) / 2;
    (left, top, size)
}

fn face_crop(
    width: u32,
    height: u32,
    detection: &DetectionResult,
    config: &CropConfig,
) -> (i64, i64, i64) {
    let face = &detection.face;
    let (anchor_y, limit_y) = match (
        detection.landmark(Landmark::LowerLip),
        detection.landmark(Landmark::NoseBridge),
    ) {
        (Some(lip), Some(nose)) => (lip.y, nose.y),
        _ => (
            face.y + face.height * config.anchor_fraction,
            face.y + face.height * config.limit_fraction,
        ),
    };

    let nominal = if width > height {
        height as f64 * config.landscape_ratio
    } else {
        width as f64 * config.portrait_ratio
    };
    let min_size = config.min_size as i64;
    let size = (nominal.round() as i64).max(min_size);

    let left = (face.center_x() - size as f64 / 2.0).round() as i64;

    let anchor = anchor_y.round() as i64;
    let mut top = anchor;
    if height as i64 - anchor < min_size {
        // Make room for the floor, but never start above the nose bridge.
        let limit = limit_y.round() as i64;
        top = (height as i64 - min_size).max(limit).min(anchor).max(0);
    }

    (left, top, size)
}

/// Clamp a candidate square into the image, shrinking it if needed.
fn fit(left: i64, top: i64, size: i64, width: u32, height: u32) -> CropRect {
    let (w, h) = (width as i64, height as i64);
    let size = size.clamp(1, w.min(h));
    let left = left.clamp(0, w - size);
    let top = top.clamp(0, h - 1);
    let size = size.min(h - top).min(w - left).max(1);

    CropRect {
        left: left as u32,
        top: top as u32,
        size: size as u32,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::face_detector::{FaceBox, Point};

    fn boxed(x: f64, y: f64, width: f64, height: f64) -> DetectionResult {
        DetectionResult::from_box(
            FaceBox {
                x,
                y,
                width,
                height,
            },
            0.9,
        )
    }

    fn with_points(detection: DetectionResult, lip_y: f64, nose_y: f64) -> DetectionResult {
        let cx = detection.face.center_x();
        let mut points = BTreeMap::new();
        points.insert(Landmark::LowerLip, Point::new(cx, lip_y));
        points.insert(Landmark::NoseBridge, Point::new(cx, nose_y));
        detection.with_landmarks(points)
    }

    fn assert_contained(rect: CropRect, width: u32, height: u32) {
        assert!(rect.size >= 1, "{rect:?} in {width}x{height}");
        assert!(rect.left + rect.size <= width, "{rect:?} in {width}x{height}");
        assert!(rect.top + rect.size <= height, "{rect:?} in {width}x{height}");
    }

    #[test]
    fn landscape_without_face_centers_reference_square() {
        let rect = resolve_crop(1920, 1080, None, &CropConfig::default());
        assert_eq!(
            rect,
            CropRect {
                left: 460,
                top: 40,
                size: 1000
            }
        );
    }

    #[test]
    fn small_image_without_face_uses_short_side() {
        let rect = resolve_crop(640, 480, None, &CropConfig::default());
        assert_eq!(
            rect,
            CropRect {
                left: 80,
                top: 0,
                size: 480
            }
        );
    }

    #[test]
    fn portrait_with_landmarks_starts_at_lip() {
        let detection = with_points(boxed(300.0, 350.0, 200.0, 400.0), 700.0, 500.0);
        let rect = resolve_crop(800, 1200, Some(&detection), &CropConfig::default());
        assert_eq!(rect.top, 700);
        assert_eq!(rect.size, 400);
        assert_eq!(rect.left, 200);
    }

    #[test]
    fn low_anchor_is_pulled_up_to_floor() {
        let detection = with_points(boxed(300.0, 700.0, 200.0, 300.0), 1050.0, 800.0);
        let rect = resolve_crop(800, 1200, Some(&detection), &CropConfig::default());
        // 150px below the lip is under the 300px floor: pull up to 1200 - 300.
        assert_eq!(rect.top, 900);
        assert_eq!(rect.size, 300);
    }

    #[test]
    fn pull_up_stops_at_nose_bridge() {
        let detection = with_points(boxed(300.0, 900.0, 200.0, 280.0), 1150.0, 1000.0);
        let rect = resolve_crop(800, 1200, Some(&detection), &CropConfig::default());
        assert_eq!(rect.top, 1000);
        // Clamping wins over the floor.
        assert_eq!(rect.size, 200);
    }

    #[test]
    fn box_only_estimates_anchor_from_fractions() {
        let detection = boxed(300.0, 100.0, 200.0, 400.0);
        let rect = resolve_crop(800, 1200, Some(&detection), &CropConfig::default());
        // 100 + 0.75 × 400
        assert_eq!(rect.top, 400);
        assert_eq!(rect.left, 200);
    }

    #[test]
    fn partial_landmarks_fall_back_to_box() {
        let mut points = BTreeMap::new();
        points.insert(Landmark::LeftEye, Point::new(350.0, 200.0));
        let detection = boxed(300.0, 100.0, 200.0, 400.0).with_landmarks(points);
        let rect = resolve_crop(800, 1200, Some(&detection), &CropConfig::default());
        assert_eq!(rect.top, 400);
    }

    #[test]
    fn landscape_size_follows_height() {
        let detection = boxed(900.0, 100.0, 120.0, 160.0);
        let rect = resolve_crop(1920, 1080, Some(&detection), &CropConfig::default());
        // 0.8 × 1080 = 864, top = 100 + 120 = 220, 860 rows remain.
        assert_eq!(rect.top, 220);
        assert_eq!(rect.size, 860);
        assert_eq!(rect.left, 960 - 432);
    }

    #[test]
    fn face_near_edge_is_shifted_inside() {
        let detection = boxed(0.0, 10.0, 40.0, 40.0);
        let rect = resolve_crop(800, 1200, Some(&detection), &CropConfig::default());
        assert_eq!(rect.left, 0);
        assert_contained(rect, 800, 1200);
    }

    #[test]
    fn zero_sized_image_gives_empty_crop() {
        let rect = resolve_crop(0, 100, None, &CropConfig::default());
        assert_eq!(rect.size, 0);
    }

    #[test]
    fn containment_holds_for_all_variants() {
        let config = CropConfig::default();
        let sizes = [1u32, 2, 7, 50, 299, 300, 301, 640, 1000, 1081, 2500];
        let faces = [
            (0.0, 0.0, 1.0, 1.0),
            (-50.0, -50.0, 20.0, 20.0),
            (10.0, 10.0, 100.0, 120.0),
            (400.0, 900.0, 300.0, 300.0),
            (2000.0, 2000.0, 500.0, 600.0),
            (5.0, 1.0, 5000.0, 5000.0),
        ];

        for &width in &sizes {
            for &height in &sizes {
                assert_contained(resolve_crop(width, height, None, &config), width, height);
                for &(x, y, w, h) in &faces {
                    let plain = boxed(x, y, w, h);
                    assert_contained(
                        resolve_crop(width, height, Some(&plain), &config),
                        width,
                        height,
                    );
                    let rich = with_points(plain, y + h * 0.8, y + h * 0.5);
                    assert_contained(
                        resolve_crop(width, height, Some(&rich), &config),
                        width,
                        height,
                    );
                }
            }
        }
    }
}
