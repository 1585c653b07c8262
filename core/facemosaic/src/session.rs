use crate::brush::Brush;
use crate::compositor::StrokeCompositor;
use crate::crop::{resolve_crop, CropConfig, CropRect};
use crate::encode::{encode_named, ExportOptions, ExportedSet};
use crate::error::FaceMosaicError;
use crate::face_detector::DetectionResult;
use crate::history::{HistoryStack, DEFAULT_HISTORY_DEPTH};
use crate::pixel_buffer::PixelBuffer;

/// Lifecycle of one image in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Buffers and detection are ready; the editor is closed.
    Loaded,
    /// The editor is open and accepts strokes, undo and reset.
    Editing,
    /// The last edit was kept.
    Committed,
    /// The last edit was thrown away.
    Skipped,
}

/// Per-session settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    history_depth: usize,
    crop: CropConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            crop: CropConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum undo snapshots, baseline included (default: 20, minimum 2).
    pub fn history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    /// Crop geometry used at export time.
    pub fn crop(mut self, crop: CropConfig) -> Self {
        self.crop = crop;
        self
    }

    pub fn crop_config(&self) -> &CropConfig {
        &self.crop
    }
}

/// One image moving through the redaction pipeline.
///
/// Holds the untouched original, the last committed redaction, and the
/// working surface the editor paints on. Stroke, undo and in-editor reset
/// calls are only accepted while the session is [`SessionState::Editing`].
#[derive(Debug)]
pub struct EditSession {
    original: PixelBuffer,
    committed: PixelBuffer,
    working: PixelBuffer,
    detection: Option<DetectionResult>,
    history: HistoryStack,
    compositor: StrokeCompositor,
    last_position: Option<(f64, f64)>,
    brush: Brush,
    state: SessionState,
    config: SessionConfig,
}

fn round_position((x, y): (f64, f64)) -> (i32, i32) {
    (x.round() as i32, y.round() as i32)
}

fn finite_position(x: f64, y: f64) -> Result<(f64, f64), FaceMosaicError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(FaceMosaicError::InvalidCoordinate { x, y });
    }
    Ok((x, y))
}

/// Axis-aligned rectangle `[x0, x1] × [y0, y1]` in pointer space.
#[derive(Debug, Clone, Copy)]
struct Region {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Region {
    fn clamp(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (x.clamp(self.x0, self.x1), y.clamp(self.y0, self.y1))
    }

    /// Liang-Barsky clip of the segment `from → to`. `None` when the segment
    /// misses the region.
    fn clip(&self, from: (f64, f64), to: (f64, f64)) -> Option<((f64, f64), (f64, f64))> {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
        let edges = [
            (-dx, from.0 - self.x0),
            (dx, self.x1 - from.0),
            (-dy, from.1 - self.y0),
            (dy, self.y1 - from.1),
        ];
        for (p, q) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
            if t0 > t1 {
                return None;
            }
        }
        let at = |t: f64| self.clamp((from.0 + dx * t, from.1 + dy * t));
        Some((at(t0), at(t1)))
    }
}

impl EditSession {
    /// Create a session from a decoded image and its detection outcome.
    pub fn new(
        original: PixelBuffer,
        detection: Option<DetectionResult>,
        config: SessionConfig,
    ) -> Result<Self, FaceMosaicError> {
        if original.width() == 0 || original.height() == 0 {
            return Err(FaceMosaicError::ZeroDimensions);
        }
        Ok(Self {
            committed: original.clone(),
            working: original.clone(),
            original,
            detection,
            history: HistoryStack::new(config.history_depth),
            compositor: StrokeCompositor::new(),
            last_position: None,
            brush: Brush::default(),
            state: SessionState::Loaded,
            config,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn original(&self) -> &PixelBuffer {
        &self.original
    }

    /// The current redaction surface, for live preview.
    pub fn working(&self) -> &PixelBuffer {
        &self.working
    }

    /// The last committed redaction.
    pub fn committed(&self) -> &PixelBuffer {
        &self.committed
    }

    pub fn detection(&self) -> Option<&DetectionResult> {
        self.detection.as_ref()
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn brush(&self) -> Brush {
        self.brush
    }

    /// Brush used by subsequent strokes.
    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    pub fn is_stroking(&self) -> bool {
        self.compositor.is_active()
    }

    fn require_editing(&self) -> Result<(), FaceMosaicError> {
        if self.state != SessionState::Editing {
            return Err(FaceMosaicError::NotEditing(self.state));
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        log::debug!("session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Pointer positions further out than the brush radius paint nothing, so
    /// strokes are clipped to the buffer grown by that radius. This also keeps
    /// dab counts bounded by the buffer size.
    fn paint_region(&self) -> Region {
        let r = self.brush.radius() as f64;
        Region {
            x0: -r,
            y0: -r,
            x1: self.working.width() as f64 + r,
            y1: self.working.height() as f64 + r,
        }
    }

    fn abandon_stroke(&mut self) {
        self.compositor.end_stroke();
        self.last_position = None;
    }

    /// Open the editor on the committed result. The history baseline is the
    /// state at open time.
    pub fn open(&mut self) {
        self.abandon_stroke();
        self.working = self.committed.clone();
        self.history.reset(&self.working);
        self.transition(SessionState::Editing);
    }

    /// Keep the working buffer as the session's result and drop history.
    pub fn commit(&mut self) -> Result<(), FaceMosaicError> {
        self.require_editing()?;
        self.abandon_stroke();
        self.committed = self.working.clone();
        self.history.discard();
        self.transition(SessionState::Committed);
        Ok(())
    }

    /// Throw away in-progress edits and restore the last committed result.
    pub fn skip(&mut self) -> Result<(), FaceMosaicError> {
        self.require_editing()?;
        self.discard_edits();
        self.transition(SessionState::Skipped);
        Ok(())
    }

    /// Leave the session without keeping in-progress edits and return it to
    /// [`SessionState::Loaded`]. The committed result is kept.
    pub fn go_back(&mut self) {
        self.discard_edits();
        self.transition(SessionState::Loaded);
    }

    fn discard_edits(&mut self) {
        self.abandon_stroke();
        self.working = self.committed.clone();
        self.history.discard();
    }

    /// Reset to the original image.
    ///
    /// While editing this restores the working buffer and makes the original
    /// the new undo baseline. Otherwise it discards the committed redaction.
    pub fn reset(&mut self) {
        self.abandon_stroke();
        self.working = self.original.clone();
        if self.state == SessionState::Editing {
            self.history.reset(&self.working);
        } else {
            self.committed = self.original.clone();
        }
    }

    /// Step back one stroke. Undo at the baseline is a no-op.
    pub fn undo(&mut self) -> Result<bool, FaceMosaicError> {
        self.require_editing()?;
        self.abandon_stroke();
        match self.history.undo() {
            Some(previous) => {
                self.working.copy_from(previous)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Press: snapshot the working buffer and apply one dab at the pointer.
    ///
    /// A press while a stroke is still open first ends that stroke, so each
    /// drag keeps its own undo step. Non-finite positions are rejected.
    pub fn begin_stroke(&mut self, x: f64, y: f64) -> Result<(), FaceMosaicError> {
        self.require_editing()?;
        let position = finite_position(x, y)?;
        if self.compositor.end_stroke() {
            log::debug!("press during an open stroke; closing it first");
            self.history.snapshot(&self.working);
        }

        let (cx, cy) = round_position(self.paint_region().clamp(position));
        self.compositor.begin_stroke(&self.working);
        self.compositor
            .apply_dab(&mut self.working, cx, cy, &self.brush);
        self.last_position = Some(position);
        Ok(())
    }

    /// Drag: paint from the last pointer position to `(x, y)`. Returns the
    /// number of dabs; without an active stroke this is a no-op.
    pub fn stroke_to(&mut self, x: f64, y: f64) -> Result<usize, FaceMosaicError> {
        self.require_editing()?;
        let to = finite_position(x, y)?;
        let Some(from) = self.last_position else {
            return Ok(0);
        };
        self.last_position = Some(to);
        let Some((start, end)) = self.paint_region().clip(from, to) else {
            return Ok(0);
        };
        let dabs = self.compositor.stroke_to(
            &mut self.working,
            round_position(start),
            round_position(end),
            &self.brush,
        );
        Ok(dabs)
    }

    /// Release: drop the stroke snapshot and record one undo step, even for a
    /// stroke that painted nothing. Without an active stroke this is a no-op.
    pub fn end_stroke(&mut self) -> Result<(), FaceMosaicError> {
        self.require_editing()?;
        if self.compositor.end_stroke() {
            self.history.snapshot(&self.working);
        }
        self.last_position = None;
        Ok(())
    }

    /// Export crop for this image.
    pub fn crop_rect(&self) -> CropRect {
        resolve_crop(
            self.original.width(),
            self.original.height(),
            self.detection.as_ref(),
            &self.config.crop,
        )
    }

    /// The committed redaction cropped to [`EditSession::crop_rect`].
    pub fn cropped(&self) -> PixelBuffer {
        self.committed.crop(&self.crop_rect())
    }

    /// Encode original, full redaction and cropped redaction as entries
    /// `{number}A`, `{number}B` and `{number}C`.
    pub fn export(
        &self,
        number: usize,
        options: &ExportOptions,
    ) -> Result<ExportedSet, FaceMosaicError> {
        options.validate()?;
        let format = options.export_format();
        let (original_q, mosaic_q, crop_q) = options.qualities();

        Ok(ExportedSet {
            number,
            original: encode_named(&self.original, number, 'A', format, original_q)?,
            mosaic: encode_named(&self.committed, number, 'B', format, mosaic_q)?,
            cropped: encode_named(&self.cropped(), number, 'C', format, crop_q)?,
            face_detected: self.detection.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::BrushMode;
    use crate::encode::ExportFormat;
    use crate::face_detector::FaceBox;

    fn checkerboard(width: u32, height: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 0 } else { 255 };
                buf.put_pixel(x, y, [v, v, v, 255]);
            }
        }
        buf
    }

    fn session() -> EditSession {
        let mut session =
            EditSession::new(checkerboard(64, 48), None, SessionConfig::default()).unwrap();
        session.set_brush(Brush::new(6, BrushMode::Pixelate { block_size: 2 }).unwrap());
        session
    }

    #[test]
    fn starts_loaded_with_working_copy() {
        let session = session();
        assert_eq!(session.state(), SessionState::Loaded);
        assert_eq!(session.working(), session.original());
        assert!(session.history().is_empty());
    }

    #[test]
    fn rejects_empty_image() {
        let result = EditSession::new(PixelBuffer::new(0, 5), None, SessionConfig::default());
        assert!(matches!(result, Err(FaceMosaicError::ZeroDimensions)));
    }

    #[test]
    fn strokes_rejected_unless_editing() {
        let mut session = session();
        assert!(matches!(
            session.begin_stroke(10.0, 10.0),
            Err(FaceMosaicError::NotEditing(SessionState::Loaded))
        ));
        assert!(session.undo().is_err());
        assert!(session.commit().is_err());
        assert_eq!(session.working(), session.original());
    }

    #[test]
    fn open_sets_baseline() {
        let mut session = session();
        session.open();
        assert_eq!(session.state(), SessionState::Editing);
        assert_eq!(session.history().depth(), 1);
    }

    #[test]
    fn stroke_pushes_one_snapshot() {
        let mut session = session();
        session.open();
        session.begin_stroke(10.4, 9.6).unwrap();
        assert!(session.is_stroking());
        assert!(session.stroke_to(40.0, 10.0).unwrap() > 1);
        session.end_stroke().unwrap();
        assert!(!session.is_stroking());
        assert_eq!(session.history().depth(), 2);
        assert_ne!(session.working(), session.original());
    }

    #[test]
    fn tap_outside_canvas_still_records_history() {
        let mut session = session();
        session.open();
        session.begin_stroke(-500.0, -500.0).unwrap();
        session.end_stroke().unwrap();
        assert_eq!(session.history().depth(), 2);
        assert_eq!(session.working(), session.original());
    }

    #[test]
    fn press_during_open_stroke_keeps_separate_undo_steps() {
        let mut session = session();
        session.open();
        session.begin_stroke(10.0, 10.0).unwrap();
        let after_first = session.working().clone();
        session.begin_stroke(40.0, 30.0).unwrap();
        session.end_stroke().unwrap();
        assert_eq!(session.history().depth(), 3);

        assert!(session.undo().unwrap());
        assert_eq!(session.working(), &after_first);
    }

    #[test]
    fn extreme_coordinates_are_clipped() {
        let mut clipped = session();
        clipped.open();
        clipped.begin_stroke(-3e9, 20.0).unwrap();
        let dabs = clipped.stroke_to(3e9, 20.0).unwrap();
        clipped.end_stroke().unwrap();

        // Only the stretch across the buffer grown by the radius is painted.
        let spacing = clipped.brush().spacing();
        assert!(dabs as f64 <= (64.0 + 12.0) / spacing + 2.0, "{dabs} dabs");

        let mut reference = session();
        reference.open();
        reference.begin_stroke(-6.0, 20.0).unwrap();
        reference.stroke_to(70.0, 20.0).unwrap();
        reference.end_stroke().unwrap();
        assert_eq!(clipped.working(), reference.working());
    }

    #[test]
    fn stroke_far_outside_paints_nothing() {
        let mut session = session();
        session.open();
        session.begin_stroke(-1e12, -1e12).unwrap();
        assert_eq!(session.stroke_to(1e12, -1e12).unwrap(), 0);
        session.end_stroke().unwrap();
        assert_eq!(session.working(), session.original());
        assert_eq!(session.history().depth(), 2);
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let mut session = session();
        session.open();
        assert!(matches!(
            session.begin_stroke(f64::NAN, 3.0),
            Err(FaceMosaicError::InvalidCoordinate { .. })
        ));
        assert!(!session.is_stroking());

        session.begin_stroke(10.0, 10.0).unwrap();
        assert!(matches!(
            session.stroke_to(f64::INFINITY, 10.0),
            Err(FaceMosaicError::InvalidCoordinate { .. })
        ));
        // The stroke continues from its last valid position.
        assert!(session.stroke_to(20.0, 10.0).unwrap() > 1);
        session.end_stroke().unwrap();
        assert_eq!(session.history().depth(), 2);
    }

    #[test]
    fn move_and_release_without_press_are_noops() {
        let mut session = session();
        session.open();
        assert_eq!(session.stroke_to(20.0, 20.0).unwrap(), 0);
        session.end_stroke().unwrap();
        assert_eq!(session.history().depth(), 1);
        assert_eq!(session.working(), session.original());
    }

    #[test]
    fn undo_restores_previous_stroke_state() {
        let mut session = session();
        session.open();
        session.begin_stroke(10.0, 10.0).unwrap();
        session.end_stroke().unwrap();
        let after_first = session.working().clone();

        session.begin_stroke(40.0, 30.0).unwrap();
        session.end_stroke().unwrap();
        assert_ne!(session.working(), &after_first);

        assert!(session.undo().unwrap());
        assert_eq!(session.working(), &after_first);
        assert!(session.undo().unwrap());
        assert_eq!(session.working(), session.original());
        assert!(!session.undo().unwrap());
    }

    #[test]
    fn commit_keeps_edits_and_drops_history() {
        let mut session = session();
        session.open();
        session.begin_stroke(10.0, 10.0).unwrap();
        session.end_stroke().unwrap();
        session.commit().unwrap();
        assert_eq!(session.state(), SessionState::Committed);
        assert!(session.history().is_empty());
        assert_eq!(session.committed(), session.working());
        assert_ne!(session.committed(), session.original());
    }

    #[test]
    fn skip_reverts_to_last_commit() {
        let mut session = session();
        session.open();
        session.begin_stroke(10.0, 10.0).unwrap();
        session.end_stroke().unwrap();
        session.commit().unwrap();
        let committed = session.committed().clone();

        session.open();
        session.begin_stroke(40.0, 30.0).unwrap();
        session.end_stroke().unwrap();
        session.skip().unwrap();
        assert_eq!(session.state(), SessionState::Skipped);
        assert_eq!(session.working(), &committed);
        assert_eq!(session.committed(), &committed);
    }

    #[test]
    fn go_back_discards_open_stroke() {
        let mut session = session();
        session.open();
        session.begin_stroke(10.0, 10.0).unwrap();
        session.go_back();
        assert_eq!(session.state(), SessionState::Loaded);
        assert!(!session.is_stroking());
        assert_eq!(session.working(), session.original());
    }

    #[test]
    fn reset_while_editing_rebaselines() {
        let mut session = session();
        session.open();
        session.begin_stroke(10.0, 10.0).unwrap();
        session.end_stroke().unwrap();
        session.reset();
        assert_eq!(session.history().depth(), 1);
        assert_eq!(session.working(), session.original());
        assert!(!session.undo().unwrap());
    }

    #[test]
    fn reset_outside_editor_clears_commit() {
        let mut session = session();
        session.open();
        session.begin_stroke(10.0, 10.0).unwrap();
        session.end_stroke().unwrap();
        session.commit().unwrap();
        session.reset();
        assert_eq!(session.committed(), session.original());
        assert_eq!(session.state(), SessionState::Committed);
    }

    #[test]
    fn export_names_and_crop() {
        let detection = DetectionResult::from_box(
            FaceBox {
                x: 20.0,
                y: 4.0,
                width: 20.0,
                height: 20.0,
            },
            0.9,
        );
        let session =
            EditSession::new(checkerboard(64, 48), Some(detection), SessionConfig::default())
                .unwrap();
        let set = session
            .export(2, &ExportOptions::new().format(ExportFormat::Png))
            .unwrap();
        assert_eq!(set.original.name, "2A.png");
        assert_eq!(set.mosaic.name, "2B.png");
        assert_eq!(set.cropped.name, "2C.png");
        assert!(set.face_detected);
        let rect = session.crop_rect();
        assert_eq!((set.cropped.width, set.cropped.height), (rect.size, rect.size));
    }

    #[test]
    fn export_rejects_bad_quality() {
        let session = session();
        let result = session.export(1, &ExportOptions::new().mosaic_quality(3.0));
        assert!(matches!(result, Err(FaceMosaicError::InvalidQuality(_))));
    }
}
