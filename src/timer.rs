//! Interval timer driven by simulated time

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    /// Seconds between firings
    pub interval: f32,
    pub active: bool,
    /// Seconds accumulated toward the next firing
    pub time: f32,
}

impl Timer {
    /// A stopped timer
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            active: false,
            time: 0.0,
        }
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Advance by `dt`; true if the interval elapsed. The overshoot carries
    /// over to the next interval.
    pub fn step(&mut self, dt: f32) -> bool {
        if !self.active {
            return false;
        }
        self.time += dt;
        if self.time >= self.interval {
            self.time = (self.time - self.interval).min(self.interval);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_interval() {
        let mut timer = Timer::new(1.0);
        timer.start();
        assert!(!timer.step(0.5));
        assert!(!timer.step(0.25));
        assert!(timer.step(0.5));
        assert!((timer.time - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_stopped_timer_never_fires() {
        let mut timer = Timer::new(0.1);
        assert!(!timer.step(10.0));
        timer.start();
        timer.stop();
        assert!(!timer.step(10.0));
        assert_eq!(timer.time, 0.0);
    }

    #[test]
    fn test_fires_once_per_call() {
        let mut timer = Timer::new(1.0);
        timer.start();
        let fired = (0..600).filter(|_| timer.step(1.0 / 60.0)).count();
        assert!((9..=10).contains(&fired));
    }
}
