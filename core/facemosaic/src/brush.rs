use crate::error::FaceMosaicError;

/// Default brush radius in buffer pixels.
pub const DEFAULT_RADIUS: u32 = 50;

/// Default effect strength (block size or blur radius).
pub const DEFAULT_STRENGTH: u32 = 15;

/// Largest accepted brush radius.
pub const MAX_RADIUS: u32 = 10_000;

/// Largest accepted effect strength. The blur kernel grows with it, so it is
/// kept well below sizes that would stall a dab.
pub const MAX_STRENGTH: u32 = 500;

/// Effect applied inside a brush dab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrushMode {
    /// Replace whole grid cells with their average color. The grid is anchored
    /// at the buffer origin, so overlapping dabs share cell boundaries.
    Pixelate { block_size: u32 },

    /// Gaussian blur with the given radius (sigma) in buffer pixels.
    Blur { radius: u32 },
}

impl BrushMode {
    /// The mode's strength parameter.
    pub fn strength(&self) -> u32 {
        match *self {
            BrushMode::Pixelate { block_size } => block_size,
            BrushMode::Blur { radius } => radius,
        }
    }

    fn with_strength(self, strength: u32) -> Self {
        match self {
            BrushMode::Pixelate { .. } => BrushMode::Pixelate {
                block_size: strength,
            },
            BrushMode::Blur { .. } => BrushMode::Blur { radius: strength },
        }
    }
}

impl Default for BrushMode {
    fn default() -> Self {
        BrushMode::Pixelate {
            block_size: DEFAULT_STRENGTH,
        }
    }
}

/// A validated brush: radius in `1..=MAX_RADIUS`, effect strength in
/// `1..=MAX_STRENGTH`.
///
/// This is the only way parameters reach [`crate::StrokeCompositor`], which
/// relies on both values being in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brush {
    radius: u32,
    mode: BrushMode,
}

impl Brush {
    /// Build a brush, rejecting an out-of-range radius or strength.
    pub fn new(radius: u32, mode: BrushMode) -> Result<Self, FaceMosaicError> {
        if !(1..=MAX_RADIUS).contains(&radius) {
            return Err(FaceMosaicError::InvalidBrushRadius(radius));
        }
        if !(1..=MAX_STRENGTH).contains(&mode.strength()) {
            return Err(FaceMosaicError::InvalidStrength(mode.strength()));
        }
        Ok(Self { radius, mode })
    }

    /// Build a brush, clamping radius and strength into range.
    pub fn clamped(radius: u32, mode: BrushMode) -> Self {
        Self {
            radius: radius.clamp(1, MAX_RADIUS),
            mode: mode.with_strength(mode.strength().clamp(1, MAX_STRENGTH)),
        }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn mode(&self) -> BrushMode {
        self.mode
    }

    /// Distance between interpolated dab centers along a stroke.
    pub fn spacing(&self) -> f64 {
        (self.radius as f64 / 3.0).max(2.0)
    }
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            radius: DEFAULT_RADIUS,
            mode: BrushMode::default(),
        }
    }
}
