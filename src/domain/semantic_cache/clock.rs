//! Time source for cache expiry

use std::fmt::Debug;

use chrono::{DateTime, Utc};

/// Wall clock used to stamp and expire cache entries
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
