/// A normalized progress tick from the native engine.
///
/// Ticks are republished as-is: callers must tolerate out-of-order and
/// non-monotonic values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    normalized: f64,
    percentage: f64,
}

impl Progress {
    /// `normalized = raw / maximum * 100`, `percentage` is that value
    /// rounded to two decimals (ties to even). A non-positive `maximum`
    /// yields zero progress.
    pub fn new(raw: f64, maximum: f64) -> Self {
        if maximum.is_nan() || maximum <= 0.0 {
            return Self {
                normalized: 0.0,
                percentage: 0.0,
            };
        }
        let normalized = raw / maximum * 100.0;
        Self {
            normalized,
            percentage: round2(normalized),
        }
    }

    /// Unrounded percentage.
    pub fn normalized(&self) -> f64 {
        self.normalized
    }

    /// Percentage complete, rounded to two decimals.
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// Rounded percentage as a `0..1` fraction, for progress bars.
    pub fn fraction(&self) -> f64 {
        self.percentage / 100.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        let progress = Progress::new(50.0, 100.0);
        assert_eq!(progress.normalized(), 50.0);
        assert_eq!(progress.percentage(), 50.0);
        assert_eq!(progress.fraction(), 0.5);
    }

    #[test]
    fn test_rounding() {
        let progress = Progress::new(1.0, 3.0);
        assert_eq!(progress.percentage(), 33.33);
        assert!((progress.normalized() - 33.333_333).abs() < 1e-4);

        let progress = Progress::new(2.0, 3.0);
        assert_eq!(progress.percentage(), 66.67);
    }

    #[test]
    fn test_bounds() {
        for maximum in [1.0, 3.0, 7.0, 100.0, 1234.0] {
            let mut raw = 0.0;
            while raw <= maximum {
                let p = Progress::new(raw, maximum).percentage();
                assert!((0.0..=100.0).contains(&p), "{raw}/{maximum} gave {p}");
                raw += maximum / 13.0;
            }
            assert_eq!(Progress::new(maximum, maximum).percentage(), 100.0);
        }
    }

    #[test]
    fn test_non_monotonic_ticks_pass_through() {
        assert_eq!(Progress::new(80.0, 100.0).percentage(), 80.0);
        assert_eq!(Progress::new(10.0, 100.0).percentage(), 10.0);
    }

    #[test]
    fn test_zero_maximum() {
        assert_eq!(Progress::new(10.0, 0.0).percentage(), 0.0);
    }
}
