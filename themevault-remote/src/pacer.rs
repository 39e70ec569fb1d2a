//! Call pacing for the remote's leaky-bucket rate limit.
//!
//! The remote drains a fixed-capacity bucket at a fixed rate, shared by every
//! call made with one credential. Spacing calls by at least one drain
//! interval keeps the sustained rate under the ceiling; when the remote
//! reports the bucket close to full, the next call waits one extra interval.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Bucket fill ratio (percent) above which the pacer backs off.
const NEAR_FULL_PERCENT: u32 = 80;

/// Bucket usage as reported by the remote (`used/capacity`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketUsage {
    pub used: u32,
    pub capacity: u32,
}

impl BucketUsage {
    /// Parse a `"32/40"` call-limit header value.
    pub fn parse(header: &str) -> Option<Self> {
        let (used, capacity) = header.trim().split_once('/')?;
        let used = used.trim().parse().ok()?;
        let capacity = capacity.trim().parse().ok()?;
        if capacity == 0 {
            return None;
        }
        Some(Self { used, capacity })
    }

    pub fn is_near_full(&self) -> bool {
        u64::from(self.used) * 100 >= u64::from(self.capacity) * u64::from(NEAR_FULL_PERCENT)
    }
}

#[derive(Debug, Default)]
struct PacerState {
    last_call: Option<Instant>,
    penalty: Duration,
}

/// Enforces a minimum spacing between consecutive calls.
#[derive(Debug)]
pub struct Pacer {
    min_interval: Duration,
    state: Mutex<PacerState>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            state: Mutex::new(PacerState::default()),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Block until the next call is allowed, then record it as issued.
    pub fn wait(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(last) = state.last_call {
            let due = last + self.min_interval + state.penalty;
            let now = Instant::now();
            if due > now {
                let pause = due - now;
                tracing::debug!("pacing: sleeping {}ms", pause.as_millis());
                std::thread::sleep(pause);
            }
        }
        state.penalty = Duration::ZERO;
        state.last_call = Some(Instant::now());
    }

    /// Feed back the bucket usage reported with a response.
    pub fn observe(&self, usage: Option<BucketUsage>) {
        let Some(usage) = usage else { return };
        if usage.is_near_full() {
            tracing::debug!(
                "bucket at {}/{}; backing off one interval",
                usage.used,
                usage.capacity
            );
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.penalty = self.min_interval;
        }
    }
}
