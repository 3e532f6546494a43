//! Wall-clock abstraction for deterministic validity and freshness checks.
//!
//! Certificate validity windows and replay windows are both judged against
//! "now". Production code reads the system clock; tests pin time with
//! `TestClock` so boundary cases are exact.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use chrono::{DateTime, Utc};

/// Clock abstraction for time operations.
///
/// Enables dependency injection of time sources. Production code uses
/// `SystemClock`, tests inject `TestClock`.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current system time.
    fn now_system(&self) -> SystemTime;

    /// Returns the current time as a UTC timestamp.
    fn now_utc(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.now_system())
    }
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_system(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Test clock for deterministic time control.
///
/// Clones share the same underlying time, so a clock handed to a validator
/// can still be advanced from the test body.
#[derive(Debug, Clone)]
pub struct TestClock {
    /// System time as nanoseconds since UNIX_EPOCH
    system_ns: Arc<AtomicU64>,
}

impl TestClock {
    /// Creates a new test clock starting at current time.
    pub fn new() -> Self {
        Self::with_start_time(SystemTime::now())
    }

    /// Creates a test clock starting at a specific time.
    pub fn with_start_time(start: SystemTime) -> Self {
        Self { system_ns: Arc::new(AtomicU64::new(nanos_since_epoch(start))) }
    }

    /// Creates a test clock starting at a UTC timestamp.
    pub fn at(start: DateTime<Utc>) -> Self {
        Self::with_start_time(SystemTime::from(start))
    }

    /// Advances the clock by the specified duration.
    pub fn advance(&self, duration: Duration) {
        let duration_ns = u64::try_from(duration.as_nanos().min(u128::from(u64::MAX))).unwrap_or(0);
        self.system_ns.fetch_add(duration_ns, Ordering::AcqRel);
    }

    /// Jumps the clock to a specific time, forwards or backwards.
    pub fn jump_to(&self, time: SystemTime) {
        self.system_ns.store(nanos_since_epoch(time), Ordering::Release);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now_system(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(self.system_ns.load(Ordering::Acquire))
    }
}

fn nanos_since_epoch(time: SystemTime) -> u64 {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    u64::try_from(since_epoch.as_nanos().min(u128::from(u64::MAX))).unwrap_or(0)
}
