//! Span coalescing tolerances.
//!
//! Tolerances are supplied as callbacks keyed on the record so callers can
//! vary them per stream; the default implementation binds them to the
//! configured constants.

use mseedidx_mseed::RawRecord;

/// Relative tolerance of the default sample-rate comparison.
const DEFAULT_RATE_EPSILON: f64 = 1e-4;

/// Per-record tolerance callbacks.
///
/// Returning `None` selects the defaults: half a sample period for time,
/// the relative `|1 - r1/r2| < 1e-4` rule for rate.
pub trait ToleranceProvider {
    /// Time tolerance in seconds for deciding span continuity.
    fn time_tolerance(&self, record: &RawRecord) -> Option<f64>;

    /// Absolute sample-rate tolerance in Hz.
    fn rate_tolerance(&self, record: &RawRecord) -> Option<f64>;
}

/// Tolerances fixed for the whole run, from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTolerances {
    pub time: Option<f64>,
    pub rate: Option<f64>,
}

impl ToleranceProvider for FixedTolerances {
    fn time_tolerance(&self, _record: &RawRecord) -> Option<f64> {
        self.time
    }

    fn rate_tolerance(&self, _record: &RawRecord) -> Option<f64> {
        self.rate
    }
}

/// Compare two sample rates under an optional absolute tolerance.
pub fn rate_within(r1: f64, r2: f64, tolerance: Option<f64>) -> bool {
    match tolerance {
        Some(diff) => (r1 - r2).abs() <= diff,
        None => r2 != 0.0 && (1.0 - r1 / r2).abs() < DEFAULT_RATE_EPSILON,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rule_is_relative() {
        assert!(rate_within(100.0, 100.0, None));
        assert!(rate_within(100.0, 100.009, None));
        assert!(!rate_within(100.0, 100.5, None));
        assert!(!rate_within(100.0, 0.0, None));
    }

    #[test]
    fn explicit_tolerance_is_absolute() {
        assert!(rate_within(100.0, 100.5, Some(1.0)));
        assert!(!rate_within(100.0, 102.0, Some(1.0)));
    }
}
