use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageEncoder, RgbImage};

use crate::error::FaceMosaicError;
use crate::pixel_buffer::PixelBuffer;

/// Output image format for exports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    /// JPEG encoding; alpha is flattened onto white.
    #[default]
    Jpeg,

    /// Lossless PNG encoding with alpha; the quality setting is ignored.
    Png,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Png => "png",
        }
    }
}

/// Encoding settings for the three images exported per session.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    format: ExportFormat,
    original_quality: f32,
    mosaic_quality: f32,
    crop_quality: f32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Jpeg,
            original_quality: 0.95,
            mosaic_quality: 0.95,
            crop_quality: 0.92,
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output format (default: `ExportFormat::Jpeg`).
    pub fn format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Quality for the untouched original, 0.0–1.0 (default: 0.95).
    pub fn original_quality(mut self, quality: f32) -> Self {
        self.original_quality = quality;
        self
    }

    /// Quality for the full redacted image, 0.0–1.0 (default: 0.95).
    pub fn mosaic_quality(mut self, quality: f32) -> Self {
        self.mosaic_quality = quality;
        self
    }

    /// Quality for the cropped redacted image, 0.0–1.0 (default: 0.92).
    pub fn crop_quality(mut self, quality: f32) -> Self {
        self.crop_quality = quality;
        self
    }

    pub fn export_format(&self) -> ExportFormat {
        self.format
    }

    pub fn qualities(&self) -> (f32, f32, f32) {
        (self.original_quality, self.mosaic_quality, self.crop_quality)
    }

    /// Reject qualities outside `0.0..=1.0`.
    pub fn validate(&self) -> Result<(), FaceMosaicError> {
        for quality in [self.original_quality, self.mosaic_quality, self.crop_quality] {
            check_quality(quality)?;
        }
        Ok(())
    }
}

/// One encoded image ready for packaging.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Archive entry name, e.g. `3B.jpg`.
    pub name: String,
    pub data: Vec<u8>,
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
}

/// The three images exported for one session.
#[derive(Debug, Clone)]
pub struct ExportedSet {
    /// 1-based position in the batch.
    pub number: usize,
    /// Untouched source image.
    pub original: EncodedImage,
    /// Full redacted image.
    pub mosaic: EncodedImage,
    /// Redacted image cropped to the resolved crop rectangle.
    pub cropped: EncodedImage,
    /// `false` when the crop fell back to a center crop.
    pub face_detected: bool,
}

fn check_quality(quality: f32) -> Result<(), FaceMosaicError> {
    if !(0.0..=1.0).contains(&quality) {
        return Err(FaceMosaicError::InvalidQuality(quality));
    }
    Ok(())
}

/// Decode input bytes (JPEG, PNG or WebP) into an RGBA buffer.
pub fn decode_image(input: &[u8]) -> Result<PixelBuffer, FaceMosaicError> {
    let decoded: DynamicImage =
        image::load_from_memory(input).map_err(|e| FaceMosaicError::DecodeError(e.to_string()))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(FaceMosaicError::ZeroDimensions);
    }
    Ok(PixelBuffer::from_rgba_image(decoded.to_rgba8()))
}

/// Flatten alpha channel by compositing onto a white background.
pub(crate) fn flatten_alpha(buffer: &PixelBuffer) -> RgbImage {
    let mut rgb = RgbImage::new(buffer.width(), buffer.height());

    for (pixel, sample) in rgb.pixels_mut().zip(buffer.as_raw().chunks_exact(4)) {
        let [r, g, b, a] = [sample[0], sample[1], sample[2], sample[3]];
        let alpha = a as f32 / 255.0;
        let inv_alpha = 1.0 - alpha;
        // Composite over white (255, 255, 255)
        let out_r = (r as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        let out_g = (g as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        let out_b = (b as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        *pixel = image::Rgb([out_r, out_g, out_b]);
    }

    rgb
}

/// Encode a buffer to the specified format at the given quality.
pub fn encode_buffer(
    buffer: &PixelBuffer,
    format: ExportFormat,
    quality: f32,
) -> Result<Vec<u8>, FaceMosaicError> {
    check_quality(quality)?;
    if buffer.width() == 0 || buffer.height() == 0 {
        return Err(FaceMosaicError::ZeroDimensions);
    }

    let mut out = Vec::new();
    match format {
        ExportFormat::Jpeg => {
            let rgb = flatten_alpha(buffer);
            let quality_percent = ((quality * 100.0).round() as u8).max(1);
            JpegEncoder::new_with_quality(&mut out, quality_percent)
                .write_image(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    image::ExtendedColorType::Rgb8,
                )
                .map_err(|e| FaceMosaicError::EncodeError(e.to_string()))?;
        }
        ExportFormat::Png => {
            PngEncoder::new(&mut out)
                .write_image(
                    buffer.as_raw(),
                    buffer.width(),
                    buffer.height(),
                    image::ExtendedColorType::Rgba8,
                )
                .map_err(|e| FaceMosaicError::EncodeError(e.to_string()))?;
        }
    }

    Ok(out)
}

/// Encode `buffer` as archive entry `{number}{suffix}.{ext}`.
pub(crate) fn encode_named(
    buffer: &PixelBuffer,
    number: usize,
    suffix: char,
    format: ExportFormat,
    quality: f32,
) -> Result<EncodedImage, FaceMosaicError> {
    let data = encode_buffer(buffer, format, quality)?;
    Ok(EncodedImage {
        name: format!("{number}{suffix}.{}", format.extension()),
        data,
        format,
        width: buffer.width(),
        height: buffer.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_buffer(width: u32, height: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(width, height);
        for y in 0..height {
            for x in 0..width {
                // Simple gradient pattern
                buf.put_pixel(
                    x,
                    y,
                    [
                        (x * 255 / width.max(1)) as u8,
                        (y * 255 / height.max(1)) as u8,
                        128,
                        255,
                    ],
                );
            }
        }
        buf
    }

    #[test]
    fn encode_jpeg_produces_valid_output() {
        let buf = make_test_buffer(48, 64);
        let data = encode_buffer(&buf, ExportFormat::Jpeg, 0.8).unwrap();
        // JPEG magic bytes
        assert_eq!(data[0], 0xFF);
        assert_eq!(data[1], 0xD8);
    }

    #[test]
    fn encode_png_round_trips_exactly() {
        let buf = make_test_buffer(16, 9);
        let data = encode_buffer(&buf, ExportFormat::Png, 0.5).unwrap();
        assert_eq!(&data[1..4], b"PNG");
        assert_eq!(decode_image(&data).unwrap(), buf);
    }

    #[test]
    fn encode_rejects_bad_quality() {
        let buf = make_test_buffer(4, 4);
        assert!(matches!(
            encode_buffer(&buf, ExportFormat::Jpeg, 1.5),
            Err(FaceMosaicError::InvalidQuality(_))
        ));
        assert!(encode_buffer(&buf, ExportFormat::Jpeg, -0.1).is_err());
    }

    #[test]
    fn encode_rejects_empty_buffer() {
        let buf = PixelBuffer::new(0, 0);
        assert!(matches!(
            encode_buffer(&buf, ExportFormat::Png, 0.9),
            Err(FaceMosaicError::ZeroDimensions)
        ));
    }

    #[test]
    fn lower_quality_is_smaller() {
        let buf = make_test_buffer(96, 96);
        let low = encode_buffer(&buf, ExportFormat::Jpeg, 0.2).unwrap();
        let high = encode_buffer(&buf, ExportFormat::Jpeg, 0.95).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn flatten_alpha_composites_over_white() {
        // Fully transparent pixel should become white
        let mut buf = PixelBuffer::new(1, 1);
        buf.put_pixel(0, 0, [255, 0, 0, 0]);
        let rgb = flatten_alpha(&buf);
        assert_eq!(rgb.get_pixel(0, 0), &image::Rgb([255, 255, 255]));
    }

    #[test]
    fn flatten_alpha_preserves_opaque() {
        let mut buf = PixelBuffer::new(1, 1);
        buf.put_pixel(0, 0, [100, 150, 200, 255]);
        let rgb = flatten_alpha(&buf);
        assert_eq!(rgb.get_pixel(0, 0), &image::Rgb([100, 150, 200]));
    }

    #[test]
    fn decode_invalid_input_returns_error() {
        assert!(matches!(
            decode_image(b"not an image"),
            Err(FaceMosaicError::DecodeError(_))
        ));
    }

    #[test]
    fn named_entries_use_number_and_suffix() {
        let buf = make_test_buffer(8, 8);
        let image = encode_named(&buf, 3, 'B', ExportFormat::Jpeg, 0.9).unwrap();
        assert_eq!(image.name, "3B.jpg");
        assert_eq!((image.width, image.height), (8, 8));
        let image = encode_named(&buf, 12, 'C', ExportFormat::Png, 0.9).unwrap();
        assert_eq!(image.name, "12C.png");
    }

    #[test]
    fn export_options_validate_each_quality() {
        assert!(ExportOptions::default().validate().is_ok());
        assert!(ExportOptions::new().crop_quality(2.0).validate().is_err());
        assert!(ExportOptions::new().original_quality(-1.0).validate().is_err());
    }
}
