//! Simulation time.
//!
//! The simulation advances in integer ticks; one tick models a tenth of a
//! second. There is no wall-clock anywhere in the core.
use std::fmt;
use std::ops::{Add, Sub};

/// A point in simulation time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Tick(u64);

impl Tick {
    /// Construct a tick from its raw counter value.
    pub const fn from_u64(tick: u64) -> Self {
        Self(tick)
    }

    /// The raw counter value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Advance by one tick.
    pub fn advance(&mut self) {
        self.0 += 1;
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Offset a tick by a duration expressed in ticks.
impl Add<u64> for Tick {
    type Output = Tick;

    fn add(self, ticks: u64) -> Tick {
        Tick(self.0 + ticks)
    }
}

/// Elapsed ticks between two points in time. Saturates at zero.
impl Sub<Tick> for Tick {
    type Output = u64;

    fn sub(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}
