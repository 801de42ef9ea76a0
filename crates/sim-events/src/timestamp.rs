//! Simulation Clock
//!
//! Simulation time measured in whole seconds, with a compact
//! day:hour:minute:second display format. Days here are short: the world
//! runs on a fast calendar so that growth, gestation, and sleep all play
//! out within a single session.
//!
//! # Example
//!
//! ```
//! use sim_events::SimTime;
//!
//! let t = SimTime::from_seconds(90);
//! assert_eq!(t.plus_seconds(30).seconds(), 120);
//! assert!(t < t.plus_seconds(1));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds in a simulated minute.
pub const SECONDS_PER_MINUTE: u64 = 60;

/// Minutes in a simulated hour.
pub const MINUTES_PER_HOUR: u64 = 10;

/// Hours in a simulated day.
pub const HOURS_PER_DAY: u64 = 4;

/// A point in simulation time.
///
/// Internally a monotonic second counter; ordering and arithmetic never
/// roll backwards. Display renders as `DD:HH:MM:SS` on the fast calendar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime {
    seconds: u64,
}

impl SimTime {
    /// The start of the simulation.
    pub fn zero() -> Self {
        Self { seconds: 0 }
    }

    /// Creates a time from a raw second count.
    pub fn from_seconds(seconds: u64) -> Self {
        Self { seconds }
    }

    /// Total elapsed simulation seconds.
    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    /// Returns a copy advanced by `seconds`.
    ///
    /// Used when stamping deferred work: the result is never earlier than
    /// `self`.
    pub fn plus_seconds(&self, seconds: u64) -> Self {
        Self {
            seconds: self.seconds + seconds,
        }
    }

    /// Advances this time in place.
    pub fn advance(&mut self, seconds: u64) {
        self.seconds += seconds;
    }

    /// Seconds within the current minute.
    pub fn second(&self) -> u64 {
        self.seconds % SECONDS_PER_MINUTE
    }

    /// Minutes within the current hour.
    pub fn minute(&self) -> u64 {
        (self.seconds / SECONDS_PER_MINUTE) % MINUTES_PER_HOUR
    }

    /// Hours within the current day.
    pub fn hour(&self) -> u64 {
        (self.seconds / (SECONDS_PER_MINUTE * MINUTES_PER_HOUR)) % HOURS_PER_DAY
    }

    /// Whole days elapsed.
    pub fn day(&self) -> u64 {
        self.seconds / (SECONDS_PER_MINUTE * MINUTES_PER_HOUR * HOURS_PER_DAY)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.day(),
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        let t = SimTime::zero();
        assert_eq!(t.seconds(), 0);
        assert_eq!(t.day(), 0);
        assert_eq!(t.to_string(), "00:00:00:00");
    }

    #[test]
    fn test_field_breakdown() {
        // 1 day + 2 hours + 3 minutes + 4 seconds on the fast calendar.
        let seconds = (SECONDS_PER_MINUTE * MINUTES_PER_HOUR * HOURS_PER_DAY)
            + 2 * SECONDS_PER_MINUTE * MINUTES_PER_HOUR
            + 3 * SECONDS_PER_MINUTE
            + 4;
        let t = SimTime::from_seconds(seconds);
        assert_eq!(t.day(), 1);
        assert_eq!(t.hour(), 2);
        assert_eq!(t.minute(), 3);
        assert_eq!(t.second(), 4);
        assert_eq!(t.to_string(), "01:02:03:04");
    }

    #[test]
    fn test_minute_rollover() {
        let t = SimTime::from_seconds(SECONDS_PER_MINUTE - 1);
        assert_eq!(t.second(), 59);
        assert_eq!(t.minute(), 0);
        let t = t.plus_seconds(1);
        assert_eq!(t.second(), 0);
        assert_eq!(t.minute(), 1);
    }

    #[test]
    fn test_plus_seconds_never_decreases() {
        let t = SimTime::from_seconds(500);
        for delta in 0..100 {
            assert!(t.plus_seconds(delta) >= t);
        }
    }

    #[test]
    fn test_ordering() {
        let a = SimTime::from_seconds(10);
        let b = SimTime::from_seconds(20);
        assert!(a < b);
        assert!(b > a);
        assert_eq!(a, SimTime::from_seconds(10));
    }

    #[test]
    fn test_advance() {
        let mut t = SimTime::zero();
        t.advance(42);
        assert_eq!(t.seconds(), 42);
    }

    #[test]
    fn test_serde_transparent() {
        let t = SimTime::from_seconds(1234);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "1234");
        let back: SimTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
