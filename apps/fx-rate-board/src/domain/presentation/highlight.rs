//! Highlight direction, colour and the ease-out decay curve.

use std::time::Duration;

/// Direction of the last qualifying mid move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightDirection {
    /// Mid went up.
    Up,
    /// Mid went down.
    Down,
    /// Mid unchanged.
    #[default]
    Flat,
}

impl HighlightDirection {
    /// Sign of `new_mid - old_mid`.
    #[must_use]
    pub fn from_move(old_mid: f64, new_mid: f64) -> Self {
        if new_mid > old_mid {
            Self::Up
        } else if new_mid < old_mid {
            Self::Down
        } else {
            Self::Flat
        }
    }

    /// Colour at full intensity.
    #[must_use]
    pub const fn base_colour(self) -> Rgba {
        match self {
            Self::Up => Rgba::new(0, 255, 0, 180),
            Self::Down => Rgba::new(255, 0, 0, 180),
            Self::Flat => Rgba::new(128, 128, 128, 100),
        }
    }

    /// Arrow glyph for text renderers.
    #[must_use]
    pub const fn arrow(self) -> &'static str {
        match self {
            Self::Up => "▲",
            Self::Down => "▼",
            Self::Flat => "■",
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Flat => "flat",
        }
    }
}

/// 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Build a colour.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same colour with alpha scaled by `intensity` (clamped to `0..=1`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn faded(self, intensity: f64) -> Self {
        let alpha = (f64::from(self.a) * intensity.clamp(0.0, 1.0)).round() as u8;
        Self { a: alpha, ..self }
    }
}

/// Fixed-step ease-out decay from a start intensity to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayCurve {
    steps: u32,
    duration: Duration,
}

impl Default for DecayCurve {
    fn default() -> Self {
        Self {
            steps: 50,
            duration: Duration::from_millis(500),
        }
    }
}

impl DecayCurve {
    /// Build a curve. `steps` is raised to at least 1.
    #[must_use]
    pub fn new(steps: u32, duration: Duration) -> Self {
        Self {
            steps: steps.max(1),
            duration,
        }
    }

    /// Number of steps `N`.
    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.steps
    }

    /// Total duration `T`.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Interval between steps, `T / N`.
    #[must_use]
    pub fn step_interval(&self) -> Duration {
        self.duration / self.steps
    }

    /// Intensity after `step` (1-indexed) steps.
    ///
    /// `progress = step / N`, `eased = 1 - (1 - progress)^2`, intensity is
    /// `start * (1 - eased)`. Exactly `0.0` once `step >= N`.
    #[must_use]
    pub fn intensity_at(&self, start: f64, step: u32) -> f64 {
        if step >= self.steps {
            return 0.0;
        }

        let progress = f64::from(step) / f64::from(self.steps);
        let eased = 1.0 - (1.0 - progress).powi(2);
        start * (1.0 - eased)
    }
}
