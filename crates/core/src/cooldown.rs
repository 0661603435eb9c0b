//! Resend cooldown for verification emails.
//!
//! Tracked on our side as a countdown from the last successful send,
//! independent of whatever throttling the identity provider applies.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Seconds between two verification email sends.
pub const RESEND_COOLDOWN_SECS: i64 = 60;

/// Countdown state for the "resend verification email" action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendCooldown {
    last_sent: Option<DateTime<Utc>>,
}

impl ResendCooldown {
    /// Record a successful send at `now`, restarting the countdown.
    pub const fn record_send(&mut self, now: DateTime<Utc>) {
        self.last_sent = Some(now);
    }

    /// Whole seconds until another send is allowed, rounded up; 0 when ready.
    #[must_use]
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let Some(last_sent) = self.last_sent else {
            return 0;
        };
        let ready_at = last_sent + TimeDelta::seconds(RESEND_COOLDOWN_SECS);
        let remaining = ready_at - now;
        if remaining <= TimeDelta::zero() {
            return 0;
        }
        let whole = remaining.num_seconds();
        let partial = remaining - TimeDelta::seconds(whole) > TimeDelta::zero();
        u64::try_from(whole).unwrap_or(0) + u64::from(partial)
    }

    /// Whether a send is allowed at `now`.
    #[must_use]
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.remaining_secs(now) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap_or_default()
    }

    #[test]
    fn test_ready_before_any_send() {
        let cooldown = ResendCooldown::default();
        assert!(cooldown.is_ready(at(0)));
        assert_eq!(cooldown.remaining_secs(at(0)), 0);
    }

    #[test]
    fn test_blocked_within_window() {
        let mut cooldown = ResendCooldown::default();
        cooldown.record_send(at(0));

        assert!(!cooldown.is_ready(at(0)));
        assert_eq!(cooldown.remaining_secs(at(0)), 60);
        assert_eq!(cooldown.remaining_secs(at(1)), 59);
        assert!(!cooldown.is_ready(at(59)));
    }

    #[test]
    fn test_ready_after_window() {
        let mut cooldown = ResendCooldown::default();
        cooldown.record_send(at(0));

        assert!(cooldown.is_ready(at(60)));
        assert!(cooldown.is_ready(at(3600)));
    }

    #[test]
    fn test_partial_seconds_round_up() {
        let mut cooldown = ResendCooldown::default();
        cooldown.record_send(at(0));
        let now = at(10) + TimeDelta::milliseconds(250);
        assert_eq!(cooldown.remaining_secs(now), 50);
    }

    #[test]
    fn test_new_send_restarts_countdown() {
        let mut cooldown = ResendCooldown::default();
        cooldown.record_send(at(0));
        cooldown.record_send(at(70));
        assert_eq!(cooldown.remaining_secs(at(80)), 50);
    }
}
