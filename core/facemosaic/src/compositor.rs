use image::imageops;

use crate::brush::{Brush, BrushMode};
use crate::pixel_buffer::{PixelBuffer, CHANNELS};

/// Applies circular pixelate/blur dabs to a buffer.
///
/// Every dab reads its colors from a snapshot taken by [`begin_stroke`],
/// never from the live buffer, so overlapping dabs within one drag average
/// the pre-stroke pixels instead of their own output.
///
/// Calling [`apply_dab`] without an active stroke falls back to reading the
/// live buffer. That path is not isolated: repeated dabs compound.
///
/// [`begin_stroke`]: StrokeCompositor::begin_stroke
/// [`apply_dab`]: StrokeCompositor::apply_dab
#[derive(Debug, Default)]
pub struct StrokeCompositor {
    source: Option<PixelBuffer>,
}

/// Dab bounding box clipped to the buffer, exclusive upper corner.
#[derive(Debug, Clone, Copy)]
struct DabBounds {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl DabBounds {
    fn new(buffer: &PixelBuffer, cx: i32, cy: i32, radius: u32) -> Option<Self> {
        let (cx, cy, r) = (cx as i64, cy as i64, radius as i64);
        let bounds = Self {
            x0: (cx - r).max(0),
            y0: (cy - r).max(0),
            x1: (cx + r).min(buffer.width() as i64),
            y1: (cy + r).min(buffer.height() as i64),
        };
        (bounds.x1 > bounds.x0 && bounds.y1 > bounds.y0).then_some(bounds)
    }
}

impl StrokeCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a drag: capture the read source for all dabs until
    /// [`StrokeCompositor::end_stroke`].
    pub fn begin_stroke(&mut self, buffer: &PixelBuffer) {
        self.source = Some(buffer.clone());
    }

    /// Drop the stroke snapshot. Returns whether a stroke was active.
    pub fn end_stroke(&mut self) -> bool {
        self.source.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }

    /// Apply one dab centered at `(cx, cy)`. A dab that misses the buffer is a
    /// no-op.
    pub fn apply_dab(&self, buffer: &mut PixelBuffer, cx: i32, cy: i32, brush: &Brush) {
        let Some(bounds) = DabBounds::new(buffer, cx, cy, brush.radius()) else {
            return;
        };

        match &self.source {
            Some(source) if source.dimensions() == buffer.dimensions() => {
                paint(source, buffer, cx, cy, bounds, brush);
            }
            _ => {
                log::warn!("dab at ({cx}, {cy}) without an active stroke; reading live buffer");
                let live = buffer.clone();
                paint(&live, buffer, cx, cy, bounds, brush);
            }
        }
    }

    /// Apply evenly spaced dabs from `from` to `to`, both endpoints included.
    /// Returns the number of dabs applied.
    pub fn stroke_to(
        &self,
        buffer: &mut PixelBuffer,
        from: (i32, i32),
        to: (i32, i32),
        brush: &Brush,
    ) -> usize {
        let centers = dab_centers(from, to, brush.spacing());
        for &(x, y) in &centers {
            self.apply_dab(buffer, x, y, brush);
        }
        centers.len()
    }
}

/// Dab centers along the segment `from → to`, at most `spacing` apart.
pub fn dab_centers(from: (i32, i32), to: (i32, i32), spacing: f64) -> Vec<(i32, i32)> {
    let dx = (to.0 as i64 - from.0 as i64) as f64;
    let dy = (to.1 as i64 - from.1 as i64) as f64;
    let dist = (dx * dx + dy * dy).sqrt();
    let steps = ((dist / spacing).ceil() as usize).max(1);

    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            (
                (from.0 as f64 + dx * t).round() as i32,
                (from.1 as f64 + dy * t).round() as i32,
            )
        })
        .collect()
}

fn paint(
    source: &PixelBuffer,
    target: &mut PixelBuffer,
    cx: i32,
    cy: i32,
    bounds: DabBounds,
    brush: &Brush,
) {
    match brush.mode() {
        BrushMode::Pixelate { block_size } => {
            pixelate_disc(source, target, cx, cy, brush.radius(), block_size, bounds)
        }
        BrushMode::Blur { radius } => {
            blur_disc(source, target, cx, cy, brush.radius(), radius, bounds)
        }
    }
}

fn pixelate_disc(
    source: &PixelBuffer,
    target: &mut PixelBuffer,
    cx: i32,
    cy: i32,
    radius: u32,
    block_size: u32,
    bounds: DabBounds,
) {
    let bs = block_size as i64;
    let (width, height) = (target.width() as i64, target.height() as i64);
    let r2 = radius as f64 * radius as f64;
    let half = block_size as f64 / 2.0;

    // Snap the dab box outward to the global grid.
    let start_x = (bounds.x0 / bs) * bs;
    let start_y = (bounds.y0 / bs) * bs;

    let mut cell_y = start_y;
    while cell_y < bounds.y1 {
        let mut cell_x = start_x;
        while cell_x < bounds.x1 {
            let mid_x = cell_x as f64 + half - cx as f64;
            let mid_y = cell_y as f64 + half - cy as f64;
            if mid_x * mid_x + mid_y * mid_y <= r2 {
                let end_x = (cell_x + bs).min(width);
                let end_y = (cell_y + bs).min(height);
                fill_cell(source, target, cell_x, cell_y, end_x, end_y);
            }
            cell_x += bs;
        }
        cell_y += bs;
    }
}

/// Replace RGB of the cell `[x0, x1) × [y0, y1)` in `target` with the rounded
/// mean of the same cell in `source`. Alpha is left as is.
fn fill_cell(source: &PixelBuffer, target: &mut PixelBuffer, x0: i64, y0: i64, x1: i64, y1: i64) {
    let src = source.as_raw();
    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for y in y0..y1 {
        for x in x0..x1 {
            let i = source.offset(x as u32, y as u32);
            sum[0] += src[i] as u64;
            sum[1] += src[i + 1] as u64;
            sum[2] += src[i + 2] as u64;
            count += 1;
        }
    }
    if count == 0 {
        return;
    }
    let mean = sum.map(|s| ((s + count / 2) / count) as u8);

    for y in y0..y1 {
        let row_start = target.offset(x0 as u32, y as u32);
        let row_end = row_start + (x1 - x0) as usize * CHANNELS;
        for px in target.as_raw_mut()[row_start..row_end].chunks_exact_mut(CHANNELS) {
            px[..3].copy_from_slice(&mean);
        }
    }
}

fn blur_disc(
    source: &PixelBuffer,
    target: &mut PixelBuffer,
    cx: i32,
    cy: i32,
    radius: u32,
    strength: u32,
    bounds: DabBounds,
) {
    // Blur a padded window so the kernel does not fringe at the dab edge.
    let pad = 2 * strength as i64;
    let sx = (bounds.x0 - pad).max(0);
    let sy = (bounds.y0 - pad).max(0);
    let ex = (bounds.x1 + pad).min(source.width() as i64);
    let ey = (bounds.y1 + pad).min(source.height() as i64);

    let window = source
        .read_region(sx, sy, (ex - sx) as u32, (ey - sy) as u32)
        .to_rgba_image();
    let blurred = imageops::blur(&window, strength as f32);

    let r2 = radius as f64 * radius as f64;
    for y in bounds.y0..bounds.y1 {
        let dy = y as f64 + 0.5 - cy as f64;
        for x in bounds.x0..bounds.x1 {
            let dx = x as f64 + 0.5 - cx as f64;
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let sample = blurred.get_pixel((x - sx) as u32, (y - sy) as u32).0;
            target.put_pixel(x as u32, y as u32, sample);
        }
    }
}
