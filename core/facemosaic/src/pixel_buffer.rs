use image::RgbaImage;

use crate::crop::CropRect;
use crate::error::FaceMosaicError;

/// Bytes per RGBA sample.
pub const CHANNELS: usize = 4;

/// Owned row-major RGBA raster.
///
/// The sample array always holds exactly `width * height * 4` bytes. Buffers
/// are never resized in place; cropping produces a new buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Intersection of a requested rectangle with the buffer bounds, as
/// `(x0, y0, x1, y1)` with exclusive upper corners. `None` when disjoint.
fn clip(
    buf_w: u32,
    buf_h: u32,
    x: i64,
    y: i64,
    width: u32,
    height: u32,
) -> Option<(u32, u32, u32, u32)> {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + width as i64).min(buf_w as i64);
    let y1 = (y + height as i64).min(buf_h as i64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

impl PixelBuffer {
    /// Create a zero-initialized (transparent black) buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * CHANNELS],
        }
    }

    /// Wrap an existing sample array. Fails if its length does not match the
    /// dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FaceMosaicError> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(FaceMosaicError::SampleLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        // Length invariant guarantees from_raw succeeds.
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Size of the sample array in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    pub(crate) fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Sample at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Overwrite the sample at `(x, y)`. Out-of-range writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, sample: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.offset(x, y);
        self.data[i..i + CHANNELS].copy_from_slice(&sample);
    }

    /// Overwrite the whole contents with `other`, which must have the same
    /// dimensions.
    pub fn copy_from(&mut self, other: &PixelBuffer) -> Result<(), FaceMosaicError> {
        if self.dimensions() != other.dimensions() {
            return Err(FaceMosaicError::SizeMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    /// Copy out a rectangle, intersected with the buffer bounds.
    ///
    /// Never fails: a rectangle that misses the buffer entirely yields an
    /// empty 0×0 buffer.
    pub fn read_region(&self, x: i64, y: i64, width: u32, height: u32) -> PixelBuffer {
        let Some((x0, y0, x1, y1)) = clip(self.width, self.height, x, y, width, height) else {
            return PixelBuffer::new(0, 0);
        };
        let out_w = x1 - x0;
        let out_h = y1 - y0;
        let row_bytes = out_w as usize * CHANNELS;
        let mut data = Vec::with_capacity(row_bytes * out_h as usize);
        for row in y0..y1 {
            let start = self.offset(x0, row);
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }
        PixelBuffer {
            width: out_w,
            height: out_h,
            data,
        }
    }

    /// Paste `patch` with its top-left corner at `(x, y)`. Parts falling
    /// outside the buffer are dropped.
    pub fn write_region(&mut self, x: i64, y: i64, patch: &PixelBuffer) {
        let Some((x0, y0, x1, y1)) = clip(self.width, self.height, x, y, patch.width, patch.height)
        else {
            return;
        };
        let src_x = (x0 as i64 - x) as u32;
        let src_y = (y0 as i64 - y) as u32;
        let row_bytes = (x1 - x0) as usize * CHANNELS;
        for (i, row) in (y0..y1).enumerate() {
            let src = patch.offset(src_x, src_y + i as u32);
            let dst = self.offset(x0, row);
            self.data[dst..dst + row_bytes].copy_from_slice(&patch.data[src..src + row_bytes]);
        }
    }

    /// New buffer holding the pixels under `rect`.
    pub fn crop(&self, rect: &CropRect) -> PixelBuffer {
        self.read_region(rect.left as i64, rect.top as i64, rect.size, rect.size)
    }
}
