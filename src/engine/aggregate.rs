//! Aggregate (time-averaged) deposition rate

use super::round_to;

const AGGREGATE_DECIMALS: i32 = 3;

/// Derives the time-averaged rate of a layer
///
/// `scale` converts the thickness unit into the rate's numerator unit
/// (1000 for a monitor reporting kÅ thickness against Å/s rates).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateCalculator {
    scale: f64,
}

impl Default for AggregateCalculator {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl AggregateCalculator {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    /// Offset-corrected thickness over effective time, rounded to 3 places.
    ///
    /// Returns `None` while the effective time is zero.
    ///
    /// # Example
    /// ```
    /// use drmu::engine::AggregateCalculator;
    /// let calc = AggregateCalculator::default();
    /// assert_eq!(calc.rate(100.0, 50.0), Some(2.0));
    /// assert_eq!(calc.rate(100.0, 0.0), None);
    /// ```
    pub fn rate(&self, corrected_thickness: f64, effective_time: f64) -> Option<f64> {
        if effective_time == 0.0 {
            return None;
        }
        let rate = corrected_thickness * self.scale / effective_time;
        rate.is_finite().then(|| round_to(rate, AGGREGATE_DECIMALS))
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(100.0, 50.0, Some(2.0) ; "even division")]
    #[test_case(10.0, 3.0, Some(3.333) ; "rounded")]
    #[test_case(0.0, 20.0, Some(0.0) ; "no growth")]
    #[test_case(5.0, 0.0, None ; "zero time")]
    fn test_aggregate_rate(thickness: f64, time: f64, expected: Option<f64>) {
        assert_eq!(AggregateCalculator::default().rate(thickness, time), expected);
    }

    #[test]
    fn test_scale_applied() {
        // 0.1 kA over 50 s is 2 A/s
        let calc = AggregateCalculator::new(1000.0);
        assert_eq!(calc.rate(0.1, 50.0), Some(2.0));
    }
}
