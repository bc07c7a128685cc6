//! Simulation clock
//!
//! Time is an integer tick counter. Light timings are counted in ticks so
//! their arithmetic is exact; the elapsed seconds are carried alongside for
//! kinematics and reporting.

use std::fmt;

/// An absolute simulation tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// The single source of "now" for every component
#[derive(Debug, Clone, Default)]
pub struct Clock {
    now: Tick,
    elapsed_secs: f64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one tick covering `dt` seconds
    pub fn advance(&mut self, dt: f32) {
        self.now = Tick(self.now.0 + 1);
        self.elapsed_secs += f64::from(dt);
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1}s)", self.now, self.elapsed_secs)
    }
}
