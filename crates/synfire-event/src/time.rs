//! Simulation time as a count of whole ticks
//!
//! All entities advance synchronously, one tick at a time. Time is therefore
//! represented as a signed step count; conversion to milliseconds requires
//! the tick duration, which is configuration owned by the entity.

use core::fmt;
use core::ops::{Add, AddAssign, Sub, SubAssign};

/// Absolute simulation time in whole ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Time(pub i64);

impl Time {
    /// Create a time value from a step count
    pub const fn from_steps(steps: i64) -> Self {
        Self(steps)
    }

    /// Get the step count
    pub const fn steps(&self) -> i64 {
        self.0
    }

    /// Start of the simulation
    pub const ZERO: Self = Self(0);

    /// Convert to milliseconds given the tick duration
    pub fn to_ms(&self, ms_per_tick: f64) -> f64 {
        self.0 as f64 * ms_per_tick
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add<i64> for Time {
    type Output = Time;

    fn add(self, steps: i64) -> Time {
        Time(self.0 + steps)
    }
}

impl AddAssign<i64> for Time {
    fn add_assign(&mut self, steps: i64) {
        self.0 += steps;
    }
}

impl Sub<i64> for Time {
    type Output = Time;

    fn sub(self, steps: i64) -> Time {
        Time(self.0 - steps)
    }
}

impl SubAssign<i64> for Time {
    fn sub_assign(&mut self, steps: i64) {
        self.0 -= steps;
    }
}

impl Sub<Time> for Time {
    type Output = i64;

    fn sub(self, other: Time) -> i64 {
        self.0 - other.0
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}
