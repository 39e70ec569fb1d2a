//! End-to-end orchestrator runs against an in-memory remote and a temp
//! workspace.

use std::time::Duration;

use tempfile::TempDir;
use themevault_core::{Config, Content, Item, ItemKey, Pacing, TargetId, TargetRef};
use themevault_history::{ChangeStatus, LabelFilter, LabelKind, VersionStore};
use themevault_remote::{MemoryStore, Op, RemoteError};
use themevault_sync::{
    bootstrap, promote, push, report, rollback, Context, PromoteOptions, PushReport, Settle,
    SettlePolicy, SyncError, WorkspaceLock,
};

const LIVE: &str = "1";
const DEV: &str = "2";

fn key(s: &str) -> ItemKey {
    ItemKey::new(s).expect("key")
}

struct Harness {
    tmp: TempDir,
    config: Config,
    remote: MemoryStore,
    history: VersionStore,
}

impl Harness {
    fn new() -> Self {
        let tmp = TempDir::new().expect("workspace");
        let history = VersionStore::init(tmp.path()).expect("init history");
        let remote = MemoryStore::new();
        remote.add_target(LIVE, "Live", "main");
        remote.add_target(DEV, "Dev", "unpublished");
        let config = Config {
            store: "test.example".into(),
            api_version: "2024-01".into(),
            protected: TargetRef {
                id: TargetId::from(LIVE),
                name: "Live".into(),
            },
            mutable: TargetRef {
                id: TargetId::from(DEV),
                name: "Dev".into(),
            },
            credential: "token".into(),
            created_at: chrono::Utc::now(),
            pacing: Pacing::default(),
        };
        Self {
            tmp,
            config,
            remote,
            history,
        }
    }

    fn ctx(&self) -> Context<'_> {
        let mut ctx = Context::new(&self.config, &self.remote, &self.history);
        ctx.settle = SettlePolicy {
            max_attempts: 2,
            delay: Duration::ZERO,
        };
        ctx
    }

    fn write(&self, k: &str, body: &str) {
        self.history
            .write_item(&key(k), body.as_bytes())
            .expect("write item");
    }

    fn push(&self, keys: &[&str]) -> PushReport {
        let keys: Vec<ItemKey> = keys.iter().map(|k| key(k)).collect();
        push(&self.ctx(), &keys, None).expect("push")
    }

    fn remote_keys(&self, target: &str) -> Vec<String> {
        self.remote
            .items(&TargetId::from(target))
            .into_keys()
            .map(String::from)
            .collect()
    }

    fn remote_text(&self, target: &str, k: &str) -> Option<String> {
        self.remote
            .items(&TargetId::from(target))
            .get(&key(k))
            .map(|item| String::from_utf8_lossy(item.bytes()).into_owned())
    }

    fn no_writes(&self) -> bool {
        self.remote.calls().iter().all(|c| !c.op.is_write())
    }
}

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

#[test]
fn push_after_v1_creates_v2_with_one_modified_file() {
    let h = Harness::new();
    h.write("assets/base.css", "body {}\n");
    h.write("layout/theme.liquid", "{{ content_for_layout }}\n");
    let v1 = h.push(&["assets/base.css", "layout/theme.liquid"]);
    assert_eq!(v1.label.name, "v1-push");

    h.write("assets/base.css", "body { margin: 0 }\n");
    let v2 = h.push(&["assets/base.css"]);
    assert_eq!(v2.label.name, "v2-push");

    let diff = report::diff_labels(&h.history, "v1-push", "v2-push", false).expect("diff");
    assert_eq!(diff.files.len(), 1);
    assert_eq!(diff.files[0].key, key("assets/base.css"));
    assert_eq!(diff.files[0].status, ChangeStatus::Modified);
    assert_eq!(
        h.remote_text(DEV, "assets/base.css").as_deref(),
        Some("body { margin: 0 }\n")
    );
}

#[test]
fn pushing_unchanged_item_twice_gives_two_labels_and_no_diff() {
    let h = Harness::new();
    h.write("assets/base.css", "a {}");
    let first = h.push(&["assets/base.css"]);
    let second = h.push(&["assets/base.css"]);
    assert_ne!(first.label.name, second.label.name);
    let diff = report::diff_labels(&h.history, &first.label.name, &second.label.name, true)
        .expect("diff");
    assert!(diff.is_empty());
}

#[test]
fn partial_failure_reports_each_item_and_still_labels() {
    let h = Harness::new();
    for k in ["a.css", "b.css", "c.css"] {
        h.write(k, k);
    }
    h.remote.fail(
        Op::Put,
        &key("b.css"),
        RemoteError::Validation {
            message: "Liquid syntax error".into(),
        },
    );
    let report = h.push(&["a.css", "b.css", "c.css"]);
    assert_eq!(report.uploaded, vec![key("a.css"), key("c.css")]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].key, key("b.css"));
    assert_eq!(report.label.kind, LabelKind::Push);
}

#[test]
fn total_failure_creates_no_push_label() {
    let h = Harness::new();
    h.write("a.css", "a");
    h.write("b.css", "b");
    for k in ["a.css", "b.css"] {
        h.remote.fail(
            Op::Put,
            &key(k),
            RemoteError::Transport {
                detail: "timed out".into(),
            },
        );
    }
    let err = push(&h.ctx(), &[key("a.css"), key("b.css")], None).unwrap_err();
    match err {
        SyncError::TotalFailure { failed, pre_checkpoint } => {
            assert_eq!(failed, 2);
            assert!(h.history.checkpoint(&pre_checkpoint).is_ok());
        }
        other => panic!("expected TotalFailure, got {other:?}"),
    }
    let pushes = h
        .history
        .list_labels(&LabelFilter::kind(LabelKind::Push), None)
        .expect("labels");
    assert!(pushes.is_empty());
}

#[test]
fn auth_failure_aborts_push_without_label() {
    let h = Harness::new();
    h.write("a.css", "a");
    h.write("b.css", "b");
    h.remote.fail(Op::Put, &key("a.css"), RemoteError::Auth);
    let err = push(&h.ctx(), &[key("a.css"), key("b.css")], None).unwrap_err();
    assert!(matches!(err, SyncError::Remote(RemoteError::Auth)));
    assert_eq!(err.exit_code(), 2);
    assert!(h.history.find_label("v1-push").expect("labels").is_none());
}

#[test]
fn auth_failure_partway_labels_what_was_uploaded() {
    let h = Harness::new();
    h.write("a.css", "a");
    h.write("b.css", "b");
    h.remote.fail(Op::Put, &key("b.css"), RemoteError::Auth);

    let report = push(&h.ctx(), &[key("a.css"), key("b.css")], None).expect("push");

    assert_eq!(report.aborted, Some(RemoteError::Auth));
    assert_eq!(h.remote_keys(DEV), vec!["a.css"]);
    assert_eq!(report.label.name, "v1-push");
    let labelled = h.history.read_tree("v1-push").expect("tree");
    assert_eq!(labelled.keys().collect::<Vec<_>>(), vec![&key("a.css")]);
    assert_eq!(h.history.read_item(&key("b.css")).expect("read"), Some(b"b".to_vec()));
}

#[test]
fn concurrent_run_is_locked_out() {
    let h = Harness::new();
    h.write("a.css", "a");
    let _held = WorkspaceLock::acquire(h.tmp.path()).expect("lock");
    let err = push(&h.ctx(), &[key("a.css")], None).unwrap_err();
    assert!(matches!(err, SyncError::Locked { .. }));
    assert!(h.no_writes());
}

// ---------------------------------------------------------------------------
// Safety
// ---------------------------------------------------------------------------

#[test]
fn role_flip_to_main_blocks_push_and_rollback() {
    let h = Harness::new();
    h.write("a.css", "a");
    h.push(&["a.css"]);
    h.remote.clear_calls();

    h.remote.set_role(&TargetId::from(DEV), "main");

    let err = push(&h.ctx(), &[key("a.css")], None).unwrap_err();
    assert!(matches!(err, SyncError::Blocked { .. }));
    assert_eq!(err.exit_code(), 1);

    let err = rollback(&h.ctx(), "v1-push").unwrap_err();
    assert!(matches!(err, SyncError::Blocked { .. }));

    assert!(h.no_writes());
}

#[test]
fn vanished_target_is_unresolved() {
    let h = Harness::new();
    h.write("a.css", "a");
    h.remote.remove_target(&TargetId::from(DEV));
    let err = push(&h.ctx(), &[key("a.css")], None).unwrap_err();
    assert!(matches!(err, SyncError::Unresolved { .. }));
    assert_eq!(err.exit_code(), 2);
}

// ---------------------------------------------------------------------------
// Rollback
// ---------------------------------------------------------------------------

fn two_pushes(h: &Harness) {
    h.write("assets/base.css", "v1");
    h.write("layout/theme.liquid", "layout");
    h.push(&["assets/base.css", "layout/theme.liquid"]);
    h.write("assets/base.css", "v2");
    h.write("sections/new.liquid", "new");
    h.push(&["assets/base.css", "sections/new.liquid"]);
}

#[test]
fn rollback_restores_label_tree_and_deletes_extras() {
    let h = Harness::new();
    two_pushes(&h);
    assert_eq!(h.remote_keys(DEV).len(), 3);

    let report = rollback(&h.ctx(), "v1-push").expect("rollback");

    assert_eq!(
        h.remote_keys(DEV),
        vec!["assets/base.css", "layout/theme.liquid"]
    );
    assert_eq!(h.remote_text(DEV, "assets/base.css").as_deref(), Some("v1"));
    assert_eq!(report.deleted, vec![key("sections/new.liquid")]);
    assert!(report.is_clean());
    assert!(!h.tmp.path().join("sections/new.liquid").exists());
    assert!(report.label.name.starts_with("v1-push-rollback-"));
    assert_eq!(report.label.kind, LabelKind::Rollback);

    let after = h.history.read_tree(&report.label.name).expect("tree");
    let v1 = h.history.read_tree("v1-push").expect("tree");
    assert_eq!(after, v1);
}

#[test]
fn failed_remote_delete_keeps_local_file() {
    let h = Harness::new();
    two_pushes(&h);
    h.remote.fail(
        Op::Delete,
        &key("sections/new.liquid"),
        RemoteError::Status {
            code: 500,
            message: "boom".into(),
        },
    );

    let report = rollback(&h.ctx(), "v1-push").expect("rollback");

    assert_eq!(report.delete_failures.len(), 1);
    assert!(!report.is_clean());
    assert!(h.tmp.path().join("sections/new.liquid").exists());
    assert!(h.remote_keys(DEV).contains(&"sections/new.liquid".to_string()));
}

#[test]
fn forbidden_delete_still_labels_the_rollback() {
    let h = Harness::new();
    two_pushes(&h);
    let before = h.history.list_labels(&LabelFilter::default(), None).expect("labels");
    h.remote.fail(
        Op::Delete,
        &key("sections/new.liquid"),
        RemoteError::Forbidden {
            capability: "write_themes".into(),
        },
    );

    let report = rollback(&h.ctx(), "v1-push").expect("rollback");

    assert!(matches!(report.aborted, Some(RemoteError::Forbidden { .. })));
    assert!(!report.is_clean());
    assert_eq!(h.remote_text(DEV, "assets/base.css").as_deref(), Some("v1"));
    let after = h.history.list_labels(&LabelFilter::default(), None).expect("labels");
    assert_eq!(after.len(), before.len() + 1);
    assert!(report.label.name.starts_with("v1-push-rollback-"));
    assert!(h.tmp.path().join("sections/new.liquid").exists());
}

#[test]
fn auth_failure_during_rollback_upload_skips_reconciliation() {
    let h = Harness::new();
    two_pushes(&h);
    h.remote.fail(Op::Put, &key("layout/theme.liquid"), RemoteError::Auth);

    let report = rollback(&h.ctx(), "v1-push").expect("rollback");

    assert_eq!(report.aborted, Some(RemoteError::Auth));
    assert_eq!(report.uploaded, vec![key("assets/base.css")]);
    assert!(report.deleted.is_empty());
    assert!(h.remote_keys(DEV).contains(&"sections/new.liquid".to_string()));
    assert!(h.history.find_label(&report.label.name).expect("label").is_some());
}

#[test]
fn rollback_continues_when_target_never_settles() {
    let h = Harness::new();
    two_pushes(&h);
    // One poll for the guard, then every settle poll.
    h.remote.set_processing(&TargetId::from(DEV), 10);

    let report = rollback(&h.ctx(), "v1-push").expect("rollback");

    assert!(matches!(report.settle, Settle::Degraded { attempts: 2, .. }));
    assert_eq!(report.uploaded.len(), 2);
}

#[test]
fn rollback_to_unknown_label_fails_without_writes() {
    let h = Harness::new();
    let err = rollback(&h.ctx(), "v9-push").unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(h.no_writes());
}

#[test]
fn rollback_candidates_exclude_promotion_labels() {
    let h = Harness::new();
    h.write("a.css", "a");
    h.push(&["a.css"]);
    promote::promote(&h.ctx(), &PromoteOptions { from: None, yes: true }, &|_: &str| true)
        .expect("promote");
    let kinds: Vec<LabelKind> = rollback::candidates(&h.history, None)
        .expect("candidates")
        .into_iter()
        .map(|l| l.kind)
        .collect();
    assert_eq!(kinds, vec![LabelKind::Push]);
}

// ---------------------------------------------------------------------------
// Promotion
// ---------------------------------------------------------------------------

#[test]
fn declined_promotion_writes_nothing() {
    let h = Harness::new();
    h.write("a.css", "a");
    let err = promote::promote(&h.ctx(), &PromoteOptions::default(), &|_: &str| false)
        .unwrap_err();
    assert!(matches!(err, SyncError::Declined));
    assert!(h.no_writes());
    assert!(h.history.list_labels(&LabelFilter::default(), None).unwrap().is_empty());
}

#[test]
fn promotion_backs_up_live_and_restore_command_works() {
    let h = Harness::new();
    let live = TargetId::from(LIVE);
    h.remote.insert(
        &live,
        Item::new(key("layout/theme.liquid"), Content::Text("live layout".into())),
    );
    h.write("layout/theme.liquid", "new layout");
    h.write("assets/base.css", "css");

    let report = promote::promote(&h.ctx(), &PromoteOptions { from: None, yes: true }, &|_: &str| -> bool {
        panic!("prompt shown despite --yes")
    })
    .expect("promote");

    assert!(report.backup.name.starts_with("pre-promote-"));
    assert!(report.label.name.starts_with("promote-"));
    assert_eq!(
        report.restore_command,
        format!("themevault promote --from {} --yes", report.backup.name)
    );
    assert_eq!(
        h.remote_text(LIVE, "layout/theme.liquid").as_deref(),
        Some("new layout")
    );

    // Restoring is itself a promotion from the backup label.
    let restore = PromoteOptions {
        from: Some(report.backup.name.clone()),
        yes: true,
    };
    promote::promote(&h.ctx(), &restore, &|_: &str| true).expect("restore");
    assert_eq!(
        h.remote_text(LIVE, "layout/theme.liquid").as_deref(),
        Some("live layout")
    );
    // The working tree was never touched by the backup.
    assert_eq!(
        std::fs::read_to_string(h.tmp.path().join("layout/theme.liquid")).unwrap(),
        "new layout"
    );
}

#[test]
fn promotion_refuses_when_protected_role_changed() {
    let h = Harness::new();
    h.write("a.css", "a");
    h.remote.set_role(&TargetId::from(LIVE), "unpublished");
    let err = promote::promote(&h.ctx(), &PromoteOptions { from: None, yes: true }, &|_: &str| true)
        .unwrap_err();
    assert!(matches!(err, SyncError::NotProtected { .. }));
    assert_eq!(err.exit_code(), 2);
    assert!(h.no_writes());
}

#[test]
fn promotion_requires_safe_mutable_target() {
    let h = Harness::new();
    h.write("a.css", "a");
    h.remote.set_role(&TargetId::from(DEV), "main");
    let err = promote::promote(&h.ctx(), &PromoteOptions { from: None, yes: true }, &|_: &str| true)
        .unwrap_err();
    assert!(matches!(err, SyncError::Blocked { .. }));
    assert!(h.no_writes());
}

// ---------------------------------------------------------------------------
// Bootstrap and history
// ---------------------------------------------------------------------------

#[test]
fn bootstrap_imports_mutable_target_once() {
    let h = Harness::new();
    let dev = TargetId::from(DEV);
    h.remote.insert(&dev, Item::new(key("layout/theme.liquid"), Content::Text("t".into())));
    h.remote.insert(&dev, Item::new(key("assets/logo.png"), Content::Binary(vec![1, 2, 3])));

    let report = bootstrap(&h.ctx()).expect("bootstrap");
    assert_eq!(report.imported.len(), 2);
    assert_eq!(report.label.name, "v0-init");
    assert_eq!(std::fs::read(h.tmp.path().join("assets/logo.png")).unwrap(), vec![1, 2, 3]);
    assert!(h.no_writes());

    let err = bootstrap(&h.ctx()).unwrap_err();
    assert!(matches!(err, SyncError::AlreadyInitialized { .. }));
}

#[test]
fn history_lists_every_mutating_run() {
    let h = Harness::new();
    bootstrap(&h.ctx()).expect("bootstrap");
    h.write("a.css", "a");
    h.push(&["a.css"]);
    rollback(&h.ctx(), "v0-init").expect("rollback");

    let entries = report::list_history(&h.history, None, true).expect("history");
    let kinds: Vec<LabelKind> = entries.iter().map(|e| e.label.kind).collect();
    assert_eq!(kinds, vec![LabelKind::Rollback, LabelKind::Push, LabelKind::Init]);
    assert!(entries.iter().all(|e| e.detail.is_some()));
    assert!(h.remote_keys(DEV).is_empty());
}
