use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Process-wide minimum interval between connectivity probes
///
/// The gate is the only state shared across requests. Checking and claiming
/// the slot happen under one lock, so two concurrent callers can never both
/// pass within the same window.
#[derive(Debug)]
pub struct ProbeGate {
    window: Duration,
    last_probe: Mutex<Option<Instant>>,
}

impl ProbeGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_probe: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Claims the probe slot at `now`
    ///
    /// The slot is claimed before the probe runs, so a probe resets the gate
    /// whether it later succeeds or fails.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The caller may probe
    /// * `Err(wait)` - Another probe ran within the window; `wait` remains
    pub fn try_acquire(&self, now: Instant) -> Result<(), Duration> {
        // a poisoned lock only means another probe panicked mid-claim
        let mut last = self
            .last_probe
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = *last {
            let elapsed = now.saturating_duration_since(previous);
            if elapsed < self.window {
                return Err(self.window - elapsed);
            }
        }

        *last = Some(now);
        Ok(())
    }

    /// Time left before the next probe is allowed, if any
    pub fn time_until_next_probe(&self, now: Instant) -> Option<Duration> {
        let last = self
            .last_probe
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        last.and_then(|previous| {
            let elapsed = now.saturating_duration_since(previous);
            (elapsed < self.window).then(|| self.window - elapsed)
        })
    }
}

impl Default for ProbeGate {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

/// Whole seconds to report for a remaining wait, rounded up
pub fn wait_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs();
    if wait.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
