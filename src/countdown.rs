//! Countdown and availability flags

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the sold-out flag is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoldOutPolicy {
    /// Never derived from live data; only the remaining-count text reflects it
    #[default]
    DisplayOnly,
    /// Sold out once the fetched remaining count reaches zero
    LiveCounts,
}

/// Which start time drives the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoLiveSource {
    #[default]
    Catalog,
    /// Prefer the go-live date stored on the sale account when present
    OnChain,
}

/// Total supply minus redeemed count, as a signed value
pub fn remaining_items(total: u64, redeemed: u64) -> i128 {
    i128::from(total) - i128::from(redeemed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownParts {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub completed: bool,
}

impl CountdownParts {
    pub fn until(start: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let left = (start - now).num_seconds().max(0);
        Self {
            days: left / 86_400,
            hours: (left % 86_400) / 3_600,
            minutes: (left % 3_600) / 60,
            seconds: left % 60,
            completed: left == 0,
        }
    }
}

impl fmt::Display for CountdownParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} days, {} hours, {} minutes, {} seconds",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// One-way latch: inactive until the start time is reached.
///
/// A countdown without a start time never activates.
#[derive(Debug, Clone)]
pub struct Countdown {
    start: Option<DateTime<Utc>>,
    active: bool,
}

impl Countdown {
    /// Create the countdown; already active if `start` is in the past
    pub fn new(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let mut countdown = Self { start, active: false };
        countdown.tick(now);
        countdown
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance to `now`. Returns true only on the tick that activates.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        if self.active {
            return false;
        }
        match self.start {
            Some(start) if now >= start => {
                self.active = true;
                true
            }
            _ => false,
        }
    }

    /// Replace the start time. An active countdown stays active.
    pub fn reschedule(&mut self, start: Option<DateTime<Utc>>, now: DateTime<Utc>) {
        self.start = start;
        self.tick(now);
    }

    pub fn parts(&self, now: DateTime<Utc>) -> Option<CountdownParts> {
        self.start.map(|start| CountdownParts::until(start, now))
    }
}

/// UI flags, recomputed on every render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaleFlags {
    pub connected: bool,
    pub active: bool,
    pub sold_out: bool,
    pub minting: bool,
}

impl SaleFlags {
    pub fn derive(
        connected: bool,
        countdown: &Countdown,
        policy: SoldOutPolicy,
        live_remaining: Option<i128>,
        minting: bool,
    ) -> Self {
        let sold_out = match policy {
            SoldOutPolicy::DisplayOnly => false,
            SoldOutPolicy::LiveCounts => live_remaining.is_some_and(|left| left <= 0),
        };
        Self {
            connected,
            active: countdown.is_active(),
            sold_out,
            minting,
        }
    }

    /// The mint button only accepts clicks when this is true
    pub fn can_mint(&self) -> bool {
        self.connected && self.active && !self.sold_out && !self.minting
    }
}
