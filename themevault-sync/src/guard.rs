//! Safety guard: classifies a target immediately before a write.
//!
//! The guard never trusts the role recorded at setup; every check issues a
//! fresh `target_info` call. Anything it cannot verify is unsafe.

use themevault_core::{TargetId, TargetInfo, TargetRole};
use themevault_remote::RemoteStore;

use crate::SyncError;

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Safe {
        info: TargetInfo,
        warning: Option<String>,
    },
    Blocked {
        info: TargetInfo,
    },
    Unresolved {
        reason: String,
    },
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe { .. })
    }

    /// Turn anything but `Safe` into an error, logging the warning if any.
    pub fn require_safe(self, target: &TargetId) -> Result<TargetInfo, SyncError> {
        match self {
            Verdict::Safe { info, warning } => {
                if let Some(w) = warning {
                    tracing::warn!("{w}");
                }
                Ok(info)
            }
            Verdict::Blocked { info } => Err(SyncError::Blocked {
                id: info.id,
                name: info.name,
            }),
            Verdict::Unresolved { reason } => Err(SyncError::Unresolved {
                id: target.clone(),
                reason,
            }),
        }
    }
}

/// Classify `target` by its current remote role.
///
/// `allow_protected` lets a protected target through with a warning; only
/// promotion passes `true`.
pub fn check(remote: &dyn RemoteStore, target: &TargetId, allow_protected: bool) -> Verdict {
    let info = match remote.target_info(target) {
        Ok(info) => info,
        Err(e) => {
            tracing::debug!("guard: target {target} unresolved: {e}");
            return Verdict::Unresolved {
                reason: e.to_string(),
            };
        }
    };

    match &info.role {
        TargetRole::Protected if !allow_protected => {
            tracing::debug!("guard: target {target} is protected, blocking");
            Verdict::Blocked { info }
        }
        TargetRole::Protected => {
            let warning = Some(format!(
                "writing to protected target {} ({target}) by explicit override",
                info.name
            ));
            Verdict::Safe { info, warning }
        }
        TargetRole::Other(raw) => {
            let warning = Some(format!(
                "target {} ({target}) has unrecognized role '{raw}'; treating it as mutable",
                info.name
            ));
            Verdict::Safe { info, warning }
        }
        TargetRole::Mutable => Verdict::Safe {
            info,
            warning: None,
        },
    }
}
