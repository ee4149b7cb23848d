//! Time keeping and time checking (§4.3).
//!
//! Both are strategy objects passed in at session construction, not global
//! singletons — a client and a server in the same process (as in tests) each
//! get their own instance.

use crate::error::Error;
use std::time::Instant;

/// Produces the millisecond timestamps a session puts on the wire.
pub trait TimeKeeper {
    /// Call once, before the first timestamped message. Returns `1` if
    /// timing is supported, `0` if disabled.
    fn first(&mut self) -> u32;
    /// Milliseconds since [`TimeKeeper::first`] was called, capped at
    /// `i32::MAX`. Returns `0` if timing is disabled.
    fn now(&mut self) -> u32;
}

/// Validates the timestamps a session reads off the wire.
pub trait TimeChecker {
    /// Validate the peer's first-reported time (`M1.Time` on the server,
    /// `M2.Time` on the client). Must be `0` or `1`.
    fn report_first(&mut self, t: u32) -> Result<(), Error>;
    /// Validate a later timestamp against whatever policy this checker
    /// enforces.
    fn check(&mut self, t: u32) -> Result<(), Error>;
}

/// Does not keep time: `first()` and `now()` always return `0`. The default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTimeKeeper;

impl TimeKeeper for NullTimeKeeper {
    fn first(&mut self) -> u32 {
        0
    }
    fn now(&mut self) -> u32 {
        0
    }
}

/// Accepts any timestamp. The default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTimeChecker;

impl TimeChecker for NullTimeChecker {
    fn report_first(&mut self, t: u32) -> Result<(), Error> {
        if t == 0 || t == 1 {
            Ok(())
        } else {
            Err(Error::TimeError(format!("bad first time, {t}")))
        }
    }
    fn check(&mut self, _t: u32) -> Result<(), Error> {
        Ok(())
    }
}

/// Real wall-clock time keeper, for production sessions that want
/// timestamps on the wire. Milliseconds since the first call to
/// [`TimeKeeper::first`], capped at `i32::MAX` as the spec requires.
#[derive(Debug)]
pub struct SystemTimeKeeper {
    start: Option<Instant>,
}

impl SystemTimeKeeper {
    /// Construct a keeper that has not yet recorded its start point.
    pub fn new() -> Self {
        Self { start: None }
    }
}

impl Default for SystemTimeKeeper {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeKeeper for SystemTimeKeeper {
    fn first(&mut self) -> u32 {
        self.start = Some(Instant::now());
        1
    }
    fn now(&mut self) -> u32 {
        match self.start {
            Some(start) => start.elapsed().as_millis().min(i32::MAX as u128) as u32,
            None => 0,
        }
    }
}

/// Deterministic test double: returns the sequence `1, 2, 3, …` on every
/// call to [`TimeKeeper::first`] or [`TimeKeeper::now`], regardless of which
/// method is called. Matches the fixed-key handshake test vectors.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequenceTimeKeeper {
    next: u32,
}

impl SequenceTimeKeeper {
    /// Construct a fresh sequence starting at `1`.
    pub fn new() -> Self {
        Self { next: 0 }
    }
}

impl TimeKeeper for SequenceTimeKeeper {
    fn first(&mut self) -> u32 {
        self.next += 1;
        self.next
    }
    fn now(&mut self) -> u32 {
        self.next += 1;
        self.next
    }
}
