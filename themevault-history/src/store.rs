//! [`VersionStore`]: checkpoints, labels and the working tree they describe.
//!
//! On-disk layout under `<workspace>/.themevault/history/`:
//!
//! ```text
//! objects/<aa>/<rest>      blob content, addressed by SHA-256
//! checkpoints/<id>.json    immutable checkpoint records
//! labels.json              append-only label list
//! HEAD                     id of the current checkpoint
//! ```
//!
//! Every record is written with the `.tmp` + rename pattern.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;

use themevault_core::{paths, ItemKey};

use crate::checkpoint::{Checkpoint, CheckpointId};
use crate::diff::{compare, FileChange};
use crate::error::{io_err, json_err, HistoryError};
use crate::label::{self, Label, LabelFilter, LabelKind};
use crate::objects::{write_atomic, ObjectStore};
use crate::tree;

const OBJECTS_DIR: &str = "objects";
const CHECKPOINTS_DIR: &str = "checkpoints";
const LABELS_FILE: &str = "labels.json";
const HEAD_FILE: &str = "HEAD";

/// Shortest checkpoint id prefix accepted by [`VersionStore::resolve`].
pub const MIN_PREFIX_LEN: usize = 7;

#[derive(Debug, Clone)]
pub struct VersionStore {
    workspace: PathBuf,
    dir: PathBuf,
    objects: ObjectStore,
}

impl VersionStore {
    fn at(workspace: &Path) -> Self {
        let dir = paths::history_dir(workspace);
        Self {
            workspace: workspace.to_path_buf(),
            objects: ObjectStore::new(dir.join(OBJECTS_DIR)),
            dir,
        }
    }

    /// Create the history layout if missing and open it.
    pub fn init(workspace: &Path) -> Result<Self, HistoryError> {
        let store = Self::at(workspace);
        for sub in [OBJECTS_DIR, CHECKPOINTS_DIR] {
            let path = store.dir.join(sub);
            std::fs::create_dir_all(&path).map_err(|e| io_err(&path, e))?;
        }
        let labels = store.dir.join(LABELS_FILE);
        if !labels.exists() {
            write_atomic(&labels, b"[]\n")?;
        }
        tracing::debug!("history initialized at {}", store.dir.display());
        Ok(store)
    }

    /// Open an existing history store.
    pub fn open(workspace: &Path) -> Result<Self, HistoryError> {
        let store = Self::at(workspace);
        if !store.dir.join(CHECKPOINTS_DIR).is_dir() {
            return Err(HistoryError::NotInitialized { path: store.dir });
        }
        Ok(store)
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    // -----------------------------------------------------------------------
    // Checkpoints
    // -----------------------------------------------------------------------

    pub fn head(&self) -> Result<Option<CheckpointId>, HistoryError> {
        let path = self.dir.join(HEAD_FILE);
        match std::fs::read_to_string(&path) {
            Ok(s) if s.trim().is_empty() => Ok(None),
            Ok(s) => Ok(Some(CheckpointId(s.trim().to_string()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    fn set_head(&self, id: &CheckpointId) -> Result<(), HistoryError> {
        write_atomic(&self.dir.join(HEAD_FILE), format!("{id}\n").as_bytes())
    }

    fn checkpoint_path(&self, id: &CheckpointId) -> PathBuf {
        self.dir.join(CHECKPOINTS_DIR).join(format!("{id}.json"))
    }

    /// Load a checkpoint record by full id.
    pub fn checkpoint(&self, id: &CheckpointId) -> Result<Checkpoint, HistoryError> {
        let path = self.checkpoint_path(id);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(HistoryError::UnknownReference {
                    reference: id.to_string(),
                })
            }
            Err(e) => return Err(io_err(&path, e)),
        };
        serde_json::from_str(&contents).map_err(|e| json_err(&path, e))
    }

    fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), HistoryError> {
        let path = self.checkpoint_path(&checkpoint.id);
        let json = serde_json::to_vec_pretty(checkpoint).map_err(|e| json_err(&path, e))?;
        write_atomic(&path, &json)
    }

    /// Record the working tree as a new checkpoint and advance HEAD.
    ///
    /// Returns the HEAD checkpoint unchanged when the tree has not changed.
    pub fn snapshot(&self, message: &str) -> Result<Checkpoint, HistoryError> {
        let mut files = BTreeMap::new();
        for (key, path) in tree::scan(&self.workspace)? {
            let bytes = std::fs::read(&path).map_err(|e| io_err(&path, e))?;
            files.insert(key, self.objects.put(&bytes)?);
        }

        let parent = self.head()?;
        if let Some(head) = &parent {
            let current = self.checkpoint(head)?;
            if current.same_tree(&files) {
                tracing::debug!("snapshot '{message}': unchanged, HEAD {}", head.short());
                return Ok(current);
            }
        }

        let checkpoint = Checkpoint::new(parent, message, files);
        self.save_checkpoint(&checkpoint)?;
        self.set_head(&checkpoint.id)?;
        tracing::info!(
            "checkpoint {} ({} files): {message}",
            checkpoint.id.short(),
            checkpoint.files.len()
        );
        Ok(checkpoint)
    }

    /// Record an explicit tree without touching the working tree or HEAD.
    pub fn commit_detached(
        &self,
        message: &str,
        files: &BTreeMap<ItemKey, Vec<u8>>,
    ) -> Result<Checkpoint, HistoryError> {
        let mut hashed = BTreeMap::new();
        for (key, bytes) in files {
            hashed.insert(key.clone(), self.objects.put(bytes)?);
        }
        let checkpoint = Checkpoint::new(self.head()?, message, hashed);
        self.save_checkpoint(&checkpoint)?;
        tracing::info!(
            "detached checkpoint {} ({} files): {message}",
            checkpoint.id.short(),
            checkpoint.files.len()
        );
        Ok(checkpoint)
    }

    fn checkpoint_ids(&self) -> Result<Vec<CheckpointId>, HistoryError> {
        let dir = self.dir.join(CHECKPOINTS_DIR);
        let entries = std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|n| n.strip_suffix(".json"))
            {
                ids.push(CheckpointId(id.to_string()));
            }
        }
        Ok(ids)
    }

    // -----------------------------------------------------------------------
    // Labels
    // -----------------------------------------------------------------------

    fn labels_path(&self) -> PathBuf {
        self.dir.join(LABELS_FILE)
    }

    fn load_labels(&self) -> Result<Vec<Label>, HistoryError> {
        let path = self.labels_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| json_err(&path, e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    /// Attach a new label to `checkpoint`. Existing names are never reused.
    pub fn label(
        &self,
        checkpoint: &CheckpointId,
        name: &str,
        kind: LabelKind,
        message: &str,
    ) -> Result<Label, HistoryError> {
        self.checkpoint(checkpoint)?;
        let mut labels = self.load_labels()?;
        if labels.iter().any(|l| l.name == name) {
            return Err(HistoryError::LabelExists {
                name: name.to_string(),
            });
        }
        let label = Label {
            name: name.to_string(),
            kind,
            checkpoint: checkpoint.clone(),
            message: message.to_string(),
            created_at: Utc::now(),
            seq: labels.iter().map(|l| l.seq).max().unwrap_or(0) + 1,
        };
        labels.push(label.clone());

        let path = self.labels_path();
        let json = serde_json::to_vec_pretty(&labels).map_err(|e| json_err(&path, e))?;
        write_atomic(&path, &json)?;
        tracing::info!("label {name} -> {}", checkpoint.short());
        Ok(label)
    }

    /// Labels matching `filter`, newest first.
    pub fn list_labels(
        &self,
        filter: &LabelFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Label>, HistoryError> {
        let mut labels: Vec<Label> = self
            .load_labels()?
            .into_iter()
            .filter(|l| filter.matches(l))
            .collect();
        labels.sort_by(|a, b| (b.created_at, b.seq).cmp(&(a.created_at, a.seq)));
        if let Some(n) = limit {
            labels.truncate(n);
        }
        Ok(labels)
    }

    pub fn find_label(&self, name: &str) -> Result<Option<Label>, HistoryError> {
        Ok(self.load_labels()?.into_iter().find(|l| l.name == name))
    }

    /// Next `v<N>-push` number.
    pub fn next_version(&self) -> Result<u64, HistoryError> {
        let labels = self.load_labels()?;
        label::next_version(&labels).ok_or(HistoryError::VersionsExhausted { highest: u64::MAX })
    }

    /// `base` if unused, else the first free `base-2`, `base-3`, ...
    pub fn available_name(&self, base: &str) -> Result<String, HistoryError> {
        let taken: BTreeSet<String> = self.load_labels()?.into_iter().map(|l| l.name).collect();
        if !taken.contains(base) {
            return Ok(base.to_string());
        }
        let mut n = 2u64;
        loop {
            let candidate = format!("{base}-{n}");
            if !taken.contains(&candidate) {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    // -----------------------------------------------------------------------
    // References and trees
    // -----------------------------------------------------------------------

    /// Resolve `HEAD`, a label name, a full checkpoint id or a unique id
    /// prefix of at least [`MIN_PREFIX_LEN`] hex characters.
    pub fn resolve(&self, reference: &str) -> Result<CheckpointId, HistoryError> {
        let unknown = || HistoryError::UnknownReference {
            reference: reference.to_string(),
        };
        if reference == "HEAD" {
            return self.head()?.ok_or_else(unknown);
        }
        if let Some(label) = self.find_label(reference)? {
            return Ok(label.checkpoint);
        }
        if reference.len() < MIN_PREFIX_LEN || !reference.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(unknown());
        }
        let reference_lower = reference.to_ascii_lowercase();
        let matches: Vec<CheckpointId> = self
            .checkpoint_ids()?
            .into_iter()
            .filter(|id| id.0.starts_with(&reference_lower))
            .collect();
        match matches.len() {
            0 => Err(unknown()),
            1 => Ok(matches.into_iter().next().ok_or_else(unknown)?),
            count => Err(HistoryError::AmbiguousReference {
                reference: reference.to_string(),
                count,
            }),
        }
    }

    fn load_tree(&self, checkpoint: &Checkpoint) -> Result<BTreeMap<ItemKey, Vec<u8>>, HistoryError> {
        checkpoint
            .files
            .iter()
            .map(|(key, hash)| -> Result<_, HistoryError> {
                Ok((key.clone(), self.objects.get(hash)?))
            })
            .collect()
    }

    /// Full content of the checkpoint `reference` points at.
    pub fn read_tree(&self, reference: &str) -> Result<BTreeMap<ItemKey, Vec<u8>>, HistoryError> {
        let id = self.resolve(reference)?;
        self.load_tree(&self.checkpoint(&id)?)
    }

    /// Write the tree of `reference` into the working tree.
    ///
    /// Files outside the restored key set are left untouched.
    pub fn materialize(&self, reference: &str) -> Result<Vec<ItemKey>, HistoryError> {
        let files = self.read_tree(reference)?;
        let mut written = 0usize;
        for (key, bytes) in &files {
            if tree::write(&self.workspace, key, bytes)? {
                written += 1;
            }
        }
        tracing::info!(
            "materialized {reference}: {} files, {written} rewritten",
            files.len()
        );
        Ok(files.into_keys().collect())
    }

    /// Changes from `a` to `b`, sorted by key.
    pub fn diff(&self, a: &str, b: &str) -> Result<Vec<FileChange>, HistoryError> {
        Ok(compare(&self.read_tree(a)?, &self.read_tree(b)?))
    }

    /// Changes from HEAD to the live working tree.
    pub fn diff_uncommitted(&self) -> Result<Vec<FileChange>, HistoryError> {
        let base = match self.head()? {
            Some(id) => self.load_tree(&self.checkpoint(&id)?)?,
            None => BTreeMap::new(),
        };
        Ok(compare(&base, &self.working_tree()?))
    }

    // -----------------------------------------------------------------------
    // Working tree
    // -----------------------------------------------------------------------

    pub fn working_files(&self) -> Result<BTreeSet<ItemKey>, HistoryError> {
        Ok(tree::scan(&self.workspace)?.into_keys().collect())
    }

    pub fn working_tree(&self) -> Result<BTreeMap<ItemKey, Vec<u8>>, HistoryError> {
        tree::scan(&self.workspace)?
            .into_iter()
            .map(|(key, path)| -> Result<_, HistoryError> {
                let bytes = std::fs::read(&path).map_err(|e| io_err(&path, e))?;
                Ok((key, bytes))
            })
            .collect()
    }

    pub fn read_item(&self, key: &ItemKey) -> Result<Option<Vec<u8>>, HistoryError> {
        tree::read(&self.workspace, key)
    }

    pub fn write_item(&self, key: &ItemKey, bytes: &[u8]) -> Result<bool, HistoryError> {
        tree::write(&self.workspace, key, bytes)
    }

    pub fn remove_item(&self, key: &ItemKey) -> Result<bool, HistoryError> {
        tree::remove(&self.workspace, key)
    }
}
