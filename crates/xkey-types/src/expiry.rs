use std::fmt;

use serde::{Deserialize, Serialize};

/// Expiry record of a cached object, as kept by the host.
///
/// All fields are in seconds. `t_origin` is an absolute timestamp (seconds
/// since the UNIX epoch); `ttl`, `grace` and `keep` are durations measured
/// from it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expiry {
    /// When the object was (re)validated.
    pub t_origin: f64,
    /// Plain freshness window.
    pub ttl: f64,
    /// Window after `ttl` during which the object may be served stale.
    pub grace: f64,
    /// Window after grace during which the object is kept for revalidation.
    pub keep: f64,
}

impl Expiry {
    /// Create an expiry record.
    pub fn new(t_origin: f64, ttl: f64, grace: f64, keep: f64) -> Self {
        Self {
            t_origin,
            ttl,
            grace,
            keep,
        }
    }

    /// Age of the object at `now`.
    pub fn age(&self, now: f64) -> f64 {
        now - self.t_origin
    }

    /// Returns `true` once the object's age has exceeded its ttl. An object
    /// exactly ttl seconds old is still fresh.
    ///
    /// Grace and keep do not take part in this decision.
    pub fn is_stale(&self, now: f64) -> bool {
        self.age(now) > self.ttl
    }

    /// The record a hard purge rearms to: same origin, every window zeroed.
    pub fn hard_purged(&self) -> Self {
        Self::new(self.t_origin, 0.0, 0.0, 0.0)
    }

    /// The record a soft purge rearms to: origin moved to `now`, ttl zeroed,
    /// grace and keep kept.
    pub fn soft_purged(&self, now: f64) -> Self {
        Self::new(now, 0.0, self.grace, self.keep)
    }
}

/// How a purge invalidates the objects it reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeMode {
    /// Immediately stale, no grace window.
    Hard,
    /// Demote to gracable, only for objects already past their ttl.
    Soft,
}

impl fmt::Display for PurgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurgeMode::Hard => write!(f, "hard"),
            PurgeMode::Soft => write!(f, "soft"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_is_relative_to_origin() {
        let exp = Expiry::new(1000.0, 60.0, 10.0, 5.0);
        assert_eq!(exp.age(1030.0), 30.0);
    }

    #[test]
    fn stale_boundary_is_exclusive() {
        let exp = Expiry::new(1000.0, 60.0, 0.0, 0.0);
        assert!(!exp.is_stale(1059.0));
        assert!(!exp.is_stale(1060.0));
        assert!(exp.is_stale(1060.5));
        assert!(exp.is_stale(1200.0));
    }

    #[test]
    fn hard_purged_keeps_origin_only() {
        let exp = Expiry::new(1000.0, 60.0, 10.0, 5.0);
        assert_eq!(exp.hard_purged(), Expiry::new(1000.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn soft_purged_keeps_grace_and_keep() {
        let exp = Expiry::new(1000.0, 60.0, 10.0, 5.0);
        assert_eq!(exp.soft_purged(1100.0), Expiry::new(1100.0, 0.0, 10.0, 5.0));
    }

    #[test]
    fn purge_mode_display() {
        assert_eq!(PurgeMode::Hard.to_string(), "hard");
        assert_eq!(PurgeMode::Soft.to_string(), "soft");
    }
}
