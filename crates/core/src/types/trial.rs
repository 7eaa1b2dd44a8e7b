//! Trial window arithmetic.
//!
//! Accounts are provisioned with a time-boxed trial. The window itself is
//! stored on the account record; this type holds the pure date math so the
//! server and CLI agree on what "days remaining" means.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// A time-boxed trial attached to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialWindow {
    /// When the trial began.
    pub started_at: DateTime<Utc>,
    /// When the trial ends.
    pub ends_at: DateTime<Utc>,
}

impl TrialWindow {
    /// Create a trial window starting now and lasting `days` days.
    #[must_use]
    pub fn starting_now(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            started_at: now,
            ends_at: now + chrono::Duration::days(days),
        }
    }

    /// Whether the trial has ended as of `now`.
    #[must_use]
    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at
    }

    /// Whole days remaining as of `now`, rounded up, never negative.
    ///
    /// A trial ending in one hour still reports one day remaining; an
    /// expired trial reports zero.
    #[must_use]
    pub fn days_remaining_at(&self, now: DateTime<Utc>) -> i64 {
        let secs = (self.ends_at - now).num_seconds();
        if secs <= 0 {
            0
        } else {
            // Signed div_ceil is unstable (int_roundings); secs is positive
            // here, so unsigned ceiling division is exact.
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
            {
                (secs as u64).div_ceil(SECONDS_PER_DAY as u64) as i64
            }
        }
    }
}
