//! Stage ledger: the durable completion record of one pipeline instance.
//!
//! The ledger is a single pretty-printed JSON file per (module, lesson) pair:
//!
//! ```json
//! {
//!   "module_num": 1,
//!   "lesson_num": 9,
//!   "created_at": "2026-10-18T09:00:00Z",
//!   "last_updated": "2026-10-18T09:05:00Z",
//!   "completed_stages": ["first_draft"],
//!   "stage_files": { "first_draft": "/out/intermediate/first_draft_m001_l009.md" }
//! }
//! ```
//!
//! Writes go to a sibling temp file that is synced and renamed over the
//! ledger, so a reader sees either the previous record or the new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::LedgerError;
use crate::stage::Stage;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Identity of a pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub module: u32,
    pub lesson: u32,
}

impl LedgerKey {
    pub fn new(module: u32, lesson: u32) -> Self {
        Self { module, lesson }
    }

    /// File name of the ledger inside the intermediate directory.
    pub fn ledger_file_name(&self) -> String {
        format!("lesson_{:03}_{:03}_state.json", self.module, self.lesson)
    }

    /// Default artifact file name for a stage.
    pub fn artifact_file_name(&self, stage: Stage) -> String {
        format!("{}_m{:03}_l{:03}.md", stage, self.module, self.lesson)
    }

    /// File name of the published handout, kept at the top of the output dir.
    pub fn handout_file_name(&self) -> String {
        format!("handout_m{:03}_l{:03}.md", self.module, self.lesson)
    }
}

impl std::fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "module {:03} lesson {:03}", self.module, self.lesson)
    }
}

/// Persisted state of one pipeline instance.
///
/// A stage is complete iff it is in `completed_stages` and has an entry in
/// `stage_files`. Both are private so they can only change together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerRecord {
    pub module_num: u32,
    pub lesson_num: u32,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    completed_stages: BTreeSet<Stage>,
    stage_files: BTreeMap<Stage, PathBuf>,
}

impl LedgerRecord {
    /// A fresh record with nothing completed.
    pub fn new(key: LedgerKey) -> Self {
        let now = Utc::now();
        Self {
            module_num: key.module,
            lesson_num: key.lesson,
            created_at: now,
            last_updated: now,
            completed_stages: BTreeSet::new(),
            stage_files: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> LedgerKey {
        LedgerKey::new(self.module_num, self.lesson_num)
    }

    pub fn is_completed(&self, stage: Stage) -> bool {
        self.completed_stages.contains(&stage)
    }

    pub fn location(&self, stage: Stage) -> Option<&Path> {
        self.stage_files.get(&stage).map(PathBuf::as_path)
    }

    /// Completed stages in catalog order.
    pub fn completed(&self) -> impl Iterator<Item = Stage> + '_ {
        self.completed_stages.iter().copied()
    }

    pub fn completed_count(&self) -> usize {
        self.completed_stages.len()
    }

    /// Mark `stage` complete with its artifact location, replacing any earlier location.
    pub fn mark_completed(&mut self, stage: Stage, location: PathBuf) {
        self.completed_stages.insert(stage);
        self.stage_files.insert(stage, location);
    }

    /// Drop `stage` and every later stage. Returns the stages that were complete.
    pub fn remove_from(&mut self, stage: Stage) -> Vec<Stage> {
        let mut removed = Vec::new();
        for s in stage.and_following() {
            if self.completed_stages.remove(s) {
                removed.push(*s);
            }
            self.stage_files.remove(s);
        }
        removed
    }

    /// Check identity and the completed/location pairing against `key`.
    fn validate(&self, key: LedgerKey, path: &Path) -> Result<()> {
        if self.key() != key {
            return Err(LedgerError::IdentityMismatch {
                path: path.to_path_buf(),
                module: key.module,
                lesson: key.lesson,
                found_module: self.module_num,
                found_lesson: self.lesson_num,
            });
        }
        for stage in &self.completed_stages {
            if !self.stage_files.contains_key(stage) {
                return Err(LedgerError::Inconsistent {
                    path: path.to_path_buf(),
                    stage: *stage,
                    problem: "is completed but has no artifact location",
                });
            }
        }
        for stage in self.stage_files.keys() {
            if !self.completed_stages.contains(stage) {
                return Err(LedgerError::Inconsistent {
                    path: path.to_path_buf(),
                    stage: *stage,
                    problem: "has an artifact location but is not completed",
                });
            }
        }
        Ok(())
    }
}

/// Location and (de)serialization of one instance's ledger file.
#[derive(Debug, Clone)]
pub struct Ledger {
    key: LedgerKey,
    path: PathBuf,
}

impl Ledger {
    pub fn new(key: LedgerKey, intermediate_dir: &Path) -> Self {
        Self {
            key,
            path: intermediate_dir.join(key.ledger_file_name()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> LedgerKey {
        self.key
    }

    /// Load the record, or a fresh one if no ledger exists yet.
    pub fn load(&self) -> Result<LedgerRecord> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No ledger yet, starting fresh");
                return Ok(LedgerRecord::new(self.key));
            }
            Err(e) => {
                return Err(LedgerError::Read {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        let record: LedgerRecord =
            serde_json::from_str(&content).map_err(|e| LedgerError::Parse {
                path: self.path.clone(),
                source: e,
            })?;
        record.validate(self.key, &self.path)?;
        Ok(record)
    }

    /// Refresh `last_updated` and atomically overwrite the ledger file.
    pub fn persist(&self, record: &mut LedgerRecord) -> Result<()> {
        record.last_updated = Utc::now();
        let content = serde_json::to_string_pretty(record).map_err(LedgerError::Serialize)?;
        write_atomic(&self.path, content.as_bytes())?;
        debug!(
            path = %self.path.display(),
            completed = record.completed_count(),
            "Ledger persisted"
        );
        Ok(())
    }
}

/// Write `bytes` to `path` through a synced temp file and a rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_err = |source| LedgerError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let result = File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp_path, path));

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(write_err(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key() -> LedgerKey {
        LedgerKey::new(1, 9)
    }

    #[test]
    fn test_file_names_are_zero_padded() {
        let key = LedgerKey::new(2, 14);
        assert_eq!(key.ledger_file_name(), "lesson_002_014_state.json");
        assert_eq!(
            key.artifact_file_name(Stage::EditingInstructions),
            "editing_instructions_m002_l014.md"
        );
        assert_eq!(key.handout_file_name(), "handout_m002_l014.md");
    }

    #[test]
    fn test_same_key_same_location() {
        let dir = tempdir().unwrap();
        let a = Ledger::new(LedgerKey::new(3, 4), dir.path());
        let b = Ledger::new(LedgerKey::new(3, 4), dir.path());
        assert_eq!(a.path(), b.path());
    }

    #[test]
    fn test_load_missing_returns_fresh_record() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(key(), dir.path());
        let record = ledger.load().unwrap();
        assert_eq!(record.key(), key());
        assert_eq!(record.completed_count(), 0);
        assert_eq!(record.created_at, record.last_updated);
        assert!(!ledger.path().exists());
    }

    #[test]
    fn test_persist_then_load_roundtrip() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(key(), dir.path());
        let mut record = ledger.load().unwrap();
        record.mark_completed(Stage::FirstDraft, dir.path().join("a.md"));
        record.mark_completed(Stage::Review, dir.path().join("b.md"));
        ledger.persist(&mut record).unwrap();

        let loaded = ledger.load().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(
            loaded.completed().collect::<Vec<_>>(),
            vec![Stage::FirstDraft, Stage::Review]
        );
    }

    #[test]
    fn test_persist_refreshes_last_updated_only() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(key(), dir.path());
        let mut record = ledger.load().unwrap();
        let created = record.created_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        ledger.persist(&mut record).unwrap();
        assert_eq!(record.created_at, created);
        assert!(record.last_updated > created);
    }

    #[test]
    fn test_persist_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(key(), dir.path());
        let mut record = ledger.load().unwrap();
        ledger.persist(&mut record).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["lesson_001_009_state.json".to_string()]);
    }

    #[test]
    fn test_persisted_json_shape() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(key(), dir.path());
        let mut record = ledger.load().unwrap();
        record.mark_completed(Stage::Summary, PathBuf::from("/x/summary.md"));
        record.mark_completed(Stage::FirstDraft, PathBuf::from("/x/first.md"));
        ledger.persist(&mut record).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(ledger.path()).unwrap()).unwrap();
        assert_eq!(value["module_num"], 1);
        assert_eq!(value["lesson_num"], 9);
        assert_eq!(
            value["completed_stages"],
            serde_json::json!(["first_draft", "summary"])
        );
        assert_eq!(value["stage_files"]["summary"], "/x/summary.md");
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(key(), dir.path());
        let mut record = ledger.load().unwrap();
        ledger.persist(&mut record).unwrap();

        let mut value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(ledger.path()).unwrap()).unwrap();
        value["notes"] = serde_json::json!("hand edited");
        fs::write(ledger.path(), value.to_string()).unwrap();

        let err = ledger.load().unwrap_err();
        assert!(matches!(err, LedgerError::Parse { .. }));
    }

    #[test]
    fn test_load_rejects_unknown_stage() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(key(), dir.path());
        let json = r#"{
            "module_num": 1,
            "lesson_num": 9,
            "created_at": "2026-10-18T09:00:00Z",
            "last_updated": "2026-10-18T09:00:00Z",
            "completed_stages": ["proofreading"],
            "stage_files": {"proofreading": "/x.md"}
        }"#;
        fs::write(ledger.path(), json).unwrap();
        assert!(matches!(
            ledger.load().unwrap_err(),
            LedgerError::Parse { .. }
        ));
    }

    #[test]
    fn test_load_rejects_identity_mismatch() {
        let dir = tempdir().unwrap();
        let other = Ledger::new(LedgerKey::new(5, 5), dir.path());
        let mut record = other.load().unwrap();
        other.persist(&mut record).unwrap();

        // Copy the other instance's ledger into this key's location.
        let ledger = Ledger::new(key(), dir.path());
        fs::copy(other.path(), ledger.path()).unwrap();
        assert!(matches!(
            ledger.load().unwrap_err(),
            LedgerError::IdentityMismatch { found_module: 5, .. }
        ));
    }

    #[test]
    fn test_load_rejects_completed_without_location() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new(key(), dir.path());
        let json = r#"{
            "module_num": 1,
            "lesson_num": 9,
            "created_at": "2026-10-18T09:00:00Z",
            "last_updated": "2026-10-18T09:00:00Z",
            "completed_stages": ["first_draft"],
            "stage_files": {}
        }"#;
        fs::write(ledger.path(), json).unwrap();
        match ledger.load().unwrap_err() {
            LedgerError::Inconsistent { stage, .. } => assert_eq!(stage, Stage::FirstDraft),
            other => panic!("Expected Inconsistent, got {other:?}"),
        }
    }

    #[test]
    fn test_remove_from_cascades() {
        let mut record = LedgerRecord::new(key());
        for stage in Stage::ALL {
            record.mark_completed(stage, PathBuf::from(format!("/x/{stage}.md")));
        }
        let removed = record.remove_from(Stage::HandoutDraft);
        assert_eq!(
            removed,
            vec![
                Stage::HandoutDraft,
                Stage::EditingInstructions,
                Stage::FinalHandout
            ]
        );
        assert_eq!(record.completed_count(), 3);
        assert!(record.location(Stage::FinalHandout).is_none());
        assert!(record.location(Stage::Summary).is_some());
    }

    #[test]
    fn test_write_atomic_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("artifact.md");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_write_atomic_missing_parent_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("artifact.md");
        let err = write_atomic(&path, b"x").unwrap_err();
        match err {
            LedgerError::Write { path: p, .. } => assert_eq!(p, path),
            other => panic!("Expected Write, got {other:?}"),
        }
    }
}
