//! Bounded wait for a target to finish processing a previous upload.

use std::thread::sleep;
use std::time::Duration;

use themevault_core::{Pacing, TargetId};
use themevault_remote::RemoteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::from(&Pacing::default())
    }
}

impl From<&Pacing> for SettlePolicy {
    fn from(pacing: &Pacing) -> Self {
        Self {
            max_attempts: pacing.settle_attempts,
            delay: Duration::from_millis(pacing.settle_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settle {
    Ready,
    /// Still processing (or unreadable) after every attempt; the run goes on.
    Degraded { attempts: u32, reason: String },
}

/// Poll `target` until it reports not processing, at most
/// `policy.max_attempts` times.
pub fn wait_until_ready(remote: &dyn RemoteStore, target: &TargetId, policy: SettlePolicy) -> Settle {
    let mut reason = String::from("no attempts made");
    for attempt in 1..=policy.max_attempts {
        match remote.target_info(target) {
            Ok(info) if !info.processing => {
                tracing::debug!("target {target} ready after {attempt} poll(s)");
                return Settle::Ready;
            }
            Ok(_) => reason = "target still processing".to_string(),
            Err(e) => reason = e.to_string(),
        }
        if attempt < policy.max_attempts {
            sleep(policy.delay);
        }
    }
    tracing::warn!(
        "target {target} not ready after {} poll(s) ({reason}); continuing",
        policy.max_attempts
    );
    Settle::Degraded {
        attempts: policy.max_attempts,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use themevault_remote::MemoryStore;

    fn policy(max_attempts: u32) -> SettlePolicy {
        SettlePolicy {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    fn store() -> (MemoryStore, TargetId) {
        let store = MemoryStore::new();
        let id = TargetId::from("2");
        store.add_target(id.clone(), "Dev", "unpublished");
        (store, id)
    }

    #[test]
    fn ready_once_processing_clears() {
        let (store, id) = store();
        store.set_processing(&id, 2);
        assert_eq!(wait_until_ready(&store, &id, policy(5)), Settle::Ready);
        assert_eq!(store.calls().len(), 3);
    }

    #[test]
    fn degraded_when_attempts_run_out() {
        let (store, id) = store();
        store.set_processing(&id, 10);
        assert!(matches!(
            wait_until_ready(&store, &id, policy(3)),
            Settle::Degraded { attempts: 3, .. }
        ));
        assert_eq!(store.calls().len(), 3);
    }

    #[test]
    fn unreachable_target_degrades() {
        let (store, id) = store();
        store.set_unreachable(&id, true);
        match wait_until_ready(&store, &id, policy(2)) {
            Settle::Degraded { reason, .. } => assert!(reason.contains("transport")),
            other => panic!("expected Degraded, got {other:?}"),
        }
    }
}
