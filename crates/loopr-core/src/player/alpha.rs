//! Stretch-factor range and slider mapping
//!
//! The slider is linear in alpha between `min` and `max`. The label shows
//! playback speed, the reciprocal of alpha.

use serde::{Deserialize, Serialize};

/// Smallest alpha offered by the slider (double speed)
pub const MIN_ALPHA: f64 = 0.5;

/// Largest alpha offered by the slider (one fifth speed)
pub const MAX_ALPHA: f64 = 5.0;

/// Allowed alpha range for interactive control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlphaRange {
    pub min: f64,
    pub max: f64,
}

impl Default for AlphaRange {
    fn default() -> Self {
        Self {
            min: MIN_ALPHA,
            max: MAX_ALPHA,
        }
    }
}

impl AlphaRange {
    /// Whether the range is usable (positive, ordered, finite)
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min > 0.0 && self.min <= self.max
    }

    pub fn clamp(&self, alpha: f64) -> f64 {
        alpha.clamp(self.min, self.max)
    }

    /// Alpha for a slider position in [0, 1]
    pub fn from_slider(&self, percent: f64) -> f64 {
        self.min + (self.max - self.min) * percent.clamp(0.0, 1.0)
    }

    /// Slider position in [0, 1] for an alpha
    pub fn to_slider(&self, alpha: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((alpha - self.min) / span).clamp(0.0, 1.0)
    }
}

/// Playback speed relative to the original, as a fraction (1 / alpha)
pub fn speed_from_alpha(alpha: f64) -> f64 {
    1.0 / alpha
}

/// Speed label shown next to the slider, e.g. `"50.00%"` for alpha 2
pub fn speed_label(alpha: f64) -> String {
    format!("{:.2}%", speed_from_alpha(alpha) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slider_mapping() {
        let range = AlphaRange::default();
        assert_eq!(range.from_slider(0.0), 0.5);
        assert_eq!(range.from_slider(1.0), 5.0);
        assert!((range.from_slider(0.5) - 2.75).abs() < 1e-12);
        assert!((range.to_slider(2.75) - 0.5).abs() < 1e-12);
        assert_eq!(range.to_slider(10.0), 1.0);
        assert_eq!(range.to_slider(0.1), 0.0);
    }

    #[test]
    fn test_clamp_and_validity() {
        let range = AlphaRange::default();
        assert_eq!(range.clamp(0.1), 0.5);
        assert_eq!(range.clamp(7.0), 5.0);
        assert!(range.is_valid());
        assert!(!AlphaRange { min: 0.0, max: 1.0 }.is_valid());
        assert!(!AlphaRange { min: 2.0, max: 1.0 }.is_valid());
    }

    #[test]
    fn test_speed_label() {
        assert_eq!(speed_label(2.0), "50.00%");
        assert_eq!(speed_label(0.5), "200.00%");
        assert_eq!(speed_label(1.0), "100.00%");
    }
}
