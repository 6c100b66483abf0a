use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time, in seconds since the UNIX epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// Clock that only moves when told to. Used by tests and scenario replay.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: f64) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward (or backward, for negative `seconds`).
    pub fn advance(&self, seconds: f64) {
        *self.now.lock().expect("clock lock poisoned") += seconds;
    }

    /// Set the clock to an absolute time.
    pub fn set(&self, now: f64) {
        *self.now.lock().expect("clock lock poisoned") = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock().expect("clock lock poisoned")
    }
}
