//! Time source for the acquisition time gate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    /// seconds since the clock was created
    fn now_s(&self) -> f64;
    /// block (or pretend to) for `d`
    fn sleep(&self,d:Duration);
}

pub struct SystemClock {
    start:Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
    fn sleep(&self,d:Duration) {
        std::thread::sleep(d)
    }
}

/// Clock that only moves when told to. Clones share the same time, so a test can keep a
/// handle while the manager owns another.
#[derive(Clone,Default)]
pub struct ManualClock {
    micros:Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self,seconds:f64) {
        self.micros.store((seconds*1e6).round() as u64,Ordering::SeqCst);
    }

    pub fn advance(&self,d:Duration) {
        self.micros.fetch_add(d.as_micros() as u64,Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_s(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1e6
    }
    fn sleep(&self,d:Duration) {
        self.advance(d)
    }
}
