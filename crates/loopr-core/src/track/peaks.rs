//! Amplitude peaks of the visible channel data

/// Lowest and highest sample values across the visible channels
///
/// Both start at 0, so `low <= 0 <= high` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Peaks {
    pub low: f32,
    pub high: f32,
}

impl Peaks {
    /// Largest absolute amplitude
    #[inline]
    pub fn magnitude(&self) -> f32 {
        self.low.abs().max(self.high)
    }
}

/// Scan every channel for its extreme sample values
pub fn get_peaks<'a, I>(channels: I) -> Peaks
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut peaks = Peaks::default();
    for channel in channels {
        for &amplitude in channel {
            if amplitude < peaks.low {
                peaks.low = amplitude;
            }
            if amplitude > peaks.high {
                peaks.high = amplitude;
            }
        }
    }
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peaks_across_channels() {
        let left = [0.1, -0.3, 0.2];
        let right = [0.6, -0.1];
        let peaks = get_peaks([&left[..], &right[..]]);
        assert_eq!(peaks, Peaks { low: -0.3, high: 0.6 });
        assert_eq!(peaks.magnitude(), 0.6);
    }

    #[test]
    fn test_peaks_start_at_zero() {
        let positive = [0.2, 0.5];
        let peaks = get_peaks([&positive[..]]);
        assert_eq!(peaks.low, 0.0);
        assert_eq!(get_peaks(std::iter::empty::<&[f32]>()), Peaks::default());
    }
}
