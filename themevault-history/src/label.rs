//! Labels: named, kind-tagged, append-only pointers to checkpoints.
//!
//! Naming convention relied on by other tooling:
//!
//! | kind          | name                              |
//! |---------------|-----------------------------------|
//! | `init`        | `v0-init`                         |
//! | `push`        | `v<N>-push`                       |
//! | `rollback`    | `<label>-rollback-<unixTime>`     |
//! | `promote`     | `promote-<timestamp>`             |
//! | `pre-promote` | `pre-promote-<timestamp>`         |

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checkpoint::CheckpointId;

pub const INIT_LABEL: &str = "v0-init";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelKind {
    Init,
    Push,
    Rollback,
    Promote,
    PrePromote,
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelKind::Init => write!(f, "init"),
            LabelKind::Push => write!(f, "push"),
            LabelKind::Rollback => write!(f, "rollback"),
            LabelKind::Promote => write!(f, "promote"),
            LabelKind::PrePromote => write!(f, "pre-promote"),
        }
    }
}

impl FromStr for LabelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "init" => Ok(LabelKind::Init),
            "push" => Ok(LabelKind::Push),
            "rollback" => Ok(LabelKind::Rollback),
            "promote" => Ok(LabelKind::Promote),
            "pre-promote" => Ok(LabelKind::PrePromote),
            other => Err(format!(
                "unknown label kind '{other}'; expected: init, push, rollback, promote, pre-promote"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub kind: LabelKind,
    pub checkpoint: CheckpointId,
    pub message: String,
    pub created_at: DateTime<Utc>,
    /// Creation order; breaks ties between equal timestamps.
    pub seq: u64,
}

/// Selects labels in [`crate::VersionStore::list_labels`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFilter {
    pub kind: Option<LabelKind>,
    pub prefix: Option<String>,
}

impl LabelFilter {
    pub fn kind(kind: LabelKind) -> Self {
        Self {
            kind: Some(kind),
            prefix: None,
        }
    }

    pub fn matches(&self, label: &Label) -> bool {
        self.kind.map_or(true, |k| label.kind == k)
            && self
                .prefix
                .as_deref()
                .map_or(true, |p| label.name.starts_with(p))
    }
}

/// The `N` of a `v<N>-push` name.
pub fn push_number(name: &str) -> Option<u64> {
    name.strip_prefix('v')?
        .strip_suffix("-push")?
        .parse()
        .ok()
}

pub fn push_label_name(n: u64) -> String {
    format!("v{n}-push")
}

/// Next push version: one above the highest `v<N>-push`, or 1. `None`
/// once the highest number is `u64::MAX`.
pub fn next_version<'a>(labels: impl IntoIterator<Item = &'a Label>) -> Option<u64> {
    labels
        .into_iter()
        .filter_map(|l| push_number(&l.name))
        .max()
        .map_or(Some(1), |n| n.checked_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    fn label(name: &str, kind: LabelKind, age_hours: i64, seq: u64) -> Label {
        Label {
            name: name.into(),
            kind,
            checkpoint: CheckpointId("c".repeat(64)),
            message: String::new(),
            created_at: Utc::now() - Duration::hours(age_hours),
            seq,
        }
    }

    #[rstest]
    #[case("v1-push", Some(1))]
    #[case("v42-push", Some(42))]
    #[case("v0-init", None)]
    #[case("v-push", None)]
    #[case("vx-push", None)]
    #[case("v3-push-rollback-1700000000", None)]
    fn parses_push_numbers(#[case] name: &str, #[case] expected: Option<u64>) {
        assert_eq!(push_number(name), expected);
    }

    #[test]
    fn next_version_defaults_to_one() {
        assert_eq!(next_version(&Vec::<Label>::new()), Some(1));
        assert_eq!(next_version(&[label(INIT_LABEL, LabelKind::Init, 0, 1)]), Some(1));
    }

    #[test]
    fn next_version_skips_gaps_and_ignores_timestamps() {
        let labels = vec![
            label("v7-push", LabelKind::Push, 10, 1),
            label("v2-push", LabelKind::Push, 0, 2),
            label("v7-push-rollback-1", LabelKind::Rollback, 0, 3),
        ];
        assert_eq!(next_version(&labels), Some(8));
    }

    #[test]
    fn next_version_stops_at_u64_max() {
        let top = format!("v{}-push", u64::MAX);
        assert_eq!(next_version(&[label(&top, LabelKind::Push, 0, 1)]), None);
    }

    #[test]
    fn kind_serde_is_kebab_case() {
        assert_eq!(
            serde_json::to_string(&LabelKind::PrePromote).unwrap(),
            "\"pre-promote\""
        );
        assert_eq!("pre-promote".parse::<LabelKind>().unwrap(), LabelKind::PrePromote);
        assert!("deploy".parse::<LabelKind>().is_err());
    }

    #[test]
    fn filter_by_kind_and_prefix() {
        let push = label("v1-push", LabelKind::Push, 0, 1);
        let promote = label("promote-20240101000000", LabelKind::Promote, 0, 2);
        assert!(LabelFilter::kind(LabelKind::Push).matches(&push));
        assert!(!LabelFilter::kind(LabelKind::Push).matches(&promote));
        let by_prefix = LabelFilter {
            kind: None,
            prefix: Some("promote-".into()),
        };
        assert!(by_prefix.matches(&promote));
        assert!(!by_prefix.matches(&push));
    }
}
