//! Replay window on the claimed request timestamp.

use std::time::Duration;

use chrono::{DateTime, Utc};
use skillgate_core::{models::DEFAULT_FRESHNESS_WINDOW, GateError, Result};

/// Maximum tolerated distance between a request's claimed timestamp and now.
///
/// The distance is absolute: timestamps too far in the future are rejected
/// like stale ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow {
    window: Duration,
}

impl FreshnessWindow {
    /// Creates a window of the given width.
    pub const fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Width of the window.
    pub const fn width(&self) -> Duration {
        self.window
    }

    /// Rejects `claimed` when it lies more than the window away from `now`.
    ///
    /// # Errors
    ///
    /// Returns `GateError::StaleRequest` carrying the observed skew.
    pub fn check(&self, claimed: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
        let skew = (now - claimed).abs();
        let allowed = chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::MAX);

        if skew > allowed {
            return Err(GateError::StaleRequest { skew_seconds: whole_seconds_up(skew) });
        }

        Ok(())
    }
}

/// Skew in whole seconds, rounded up.
fn whole_seconds_up(skew: chrono::Duration) -> i64 {
    let whole = skew.num_seconds();
    if skew > chrono::Duration::seconds(whole) {
        whole.saturating_add(1)
    } else {
        whole
    }
}

impl Default for FreshnessWindow {
    fn default() -> Self {
        Self::new(DEFAULT_FRESHNESS_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z").map(|t| t.with_timezone(&Utc)).unwrap()
    }

    #[test]
    fn accepts_recent_timestamp() {
        let window = FreshnessWindow::default();
        assert!(window.check(now() - TimeDelta::seconds(100), now()).is_ok());
    }

    #[test]
    fn rejects_timestamp_outside_window() {
        let window = FreshnessWindow::default();
        let err = window.check(now() - TimeDelta::seconds(200), now()).unwrap_err();

        assert_eq!(err, GateError::StaleRequest { skew_seconds: 200 });
    }

    #[test]
    fn window_edge_is_inclusive() {
        let window = FreshnessWindow::default();

        assert!(window.check(now() - TimeDelta::seconds(150), now()).is_ok());
        assert!(window.check(now() - TimeDelta::seconds(151), now()).is_err());
    }

    #[test]
    fn fractional_skew_is_reported_rounded_up() {
        let window = FreshnessWindow::default();
        let err = window.check(now() - TimeDelta::milliseconds(150_600), now()).unwrap_err();

        assert_eq!(err, GateError::StaleRequest { skew_seconds: 151 });
    }

    #[test]
    fn rejects_timestamp_far_in_future() {
        let window = FreshnessWindow::new(Duration::from_secs(150));
        let err = window.check(now() + TimeDelta::seconds(300), now()).unwrap_err();

        assert_eq!(err, GateError::StaleRequest { skew_seconds: 300 });
    }

    #[test]
    fn custom_window_is_honoured() {
        let window = FreshnessWindow::new(Duration::from_secs(10));

        assert!(window.check(now() - TimeDelta::seconds(11), now()).is_err());
        assert_eq!(window.width(), Duration::from_secs(10));
    }
}
