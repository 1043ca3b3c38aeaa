//! Pipeline coordinator: stage sequencing over the ledger.
//!
//! The coordinator never performs stage work itself. Its caller asks which
//! stages are done, does the work for the ones that are not, and hands the
//! results back through [`Coordinator::save_stage_output`].
//!
//! Every mutation is applied to a copy of the record, persisted, and only
//! then adopted in memory. A failed persist therefore leaves the coordinator
//! exactly as it was before the call.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::ledger::{Ledger, LedgerKey, LedgerRecord, Result, write_atomic};
use crate::errors::LedgerError;
use crate::stage::Stage;

/// Sub-directory of the output root holding the ledger and stage artifacts.
pub const INTERMEDIATE_DIR: &str = "intermediate";

pub struct Coordinator {
    ledger: Ledger,
    record: LedgerRecord,
    output_root: PathBuf,
    intermediate_dir: PathBuf,
}

impl Coordinator {
    /// Open the pipeline instance for (module, lesson) under `output_root`,
    /// creating the intermediate directory and loading any existing ledger.
    pub fn open(module: u32, lesson: u32, output_root: &Path) -> Result<Self> {
        let intermediate_dir = output_root.join(INTERMEDIATE_DIR);
        fs::create_dir_all(&intermediate_dir).map_err(|e| LedgerError::CreateDir {
            path: intermediate_dir.clone(),
            source: e,
        })?;
        Self::inspect(module, lesson, output_root)
    }

    /// Open for reading only: nothing is created on disk. A lesson with no
    /// ledger yet shows up as a fresh record.
    pub fn inspect(module: u32, lesson: u32, output_root: &Path) -> Result<Self> {
        let key = LedgerKey::new(module, lesson);
        let intermediate_dir = output_root.join(INTERMEDIATE_DIR);
        let ledger = Ledger::new(key, &intermediate_dir);
        let record = ledger.load()?;

        Ok(Self {
            ledger,
            record,
            output_root: output_root.to_path_buf(),
            intermediate_dir,
        })
    }

    pub fn key(&self) -> LedgerKey {
        self.ledger.key()
    }

    pub fn ledger_path(&self) -> &Path {
        self.ledger.path()
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn record(&self) -> &LedgerRecord {
        &self.record
    }

    /// Default artifact location for a stage.
    pub fn stage_file(&self, stage: Stage) -> PathBuf {
        self.intermediate_dir
            .join(self.key().artifact_file_name(stage))
    }

    /// Location of the published handout.
    pub fn handout_file(&self) -> PathBuf {
        self.output_root.join(self.key().handout_file_name())
    }

    /// Recorded artifact location of a completed stage.
    pub fn stage_location(&self, stage: Stage) -> Option<&Path> {
        self.record.location(stage)
    }

    pub fn completed_stages(&self) -> Vec<Stage> {
        self.record.completed().collect()
    }

    pub fn is_stage_completed(&self, stage: Stage) -> bool {
        self.record.is_completed(stage)
    }

    /// Read a completed stage's artifact.
    ///
    /// Returns `None` when the stage is not complete or when its artifact can
    /// no longer be read (for instance after it was deleted by hand).
    pub fn get_stage_output(&self, stage: Stage) -> Option<String> {
        let path = self.record.location(stage)?;
        match fs::read_to_string(path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(%stage, path = %path.display(), "Artifact recorded but missing");
                None
            }
            Err(e) => {
                warn!(%stage, path = %path.display(), error = %e, "Artifact unreadable");
                None
            }
        }
    }

    /// Write `content` as the output of `stage` and mark the stage complete.
    ///
    /// The artifact goes to `explicit_location` when given, otherwise to
    /// [`Self::stage_file`]. Calling this again for a completed stage
    /// overwrites the artifact and its recorded location.
    pub fn save_stage_output(
        &mut self,
        stage: Stage,
        content: &str,
        explicit_location: Option<&Path>,
    ) -> Result<PathBuf> {
        let location = explicit_location
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.stage_file(stage));

        if let Some(parent) = location.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| LedgerError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        write_atomic(&location, content.as_bytes())?;

        self.commit(|record| record.mark_completed(stage, location.clone()))?;
        info!(%stage, path = %location.display(), "Stage completed");
        Ok(location)
    }

    /// Register an existing file as the output of `stage` without touching it.
    ///
    /// Returns `Ok(false)` and changes nothing if `path` is not an existing
    /// regular file.
    pub fn use_existing_file(&mut self, stage: Stage, path: &Path) -> Result<bool> {
        if !path.is_file() {
            warn!(%stage, path = %path.display(), "Override file does not exist");
            return Ok(false);
        }
        let location = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        self.commit(|record| record.mark_completed(stage, location.clone()))?;
        info!(%stage, path = %location.display(), "Registered existing file as stage output");
        Ok(true)
    }

    /// First stage in catalog order that is not complete.
    pub fn get_next_stage(&self) -> Option<Stage> {
        Stage::ALL
            .into_iter()
            .find(|stage| !self.record.is_completed(*stage))
    }

    /// Un-complete `stage` and every stage after it.
    pub fn reset_from_stage(&mut self, stage: Stage) -> Result<()> {
        let mut removed = Vec::new();
        self.commit(|record| removed = record.remove_from(stage))?;
        info!(%stage, removed = removed.len(), "Pipeline reset");
        Ok(())
    }

    /// Like [`Self::reset_from_stage`] but takes a raw stage name.
    ///
    /// An unrecognized name is logged and ignored: returns `Ok(false)` and the
    /// ledger is not touched.
    pub fn reset_from_stage_name(&mut self, name: &str) -> Result<bool> {
        match name.parse::<Stage>() {
            Ok(stage) => {
                self.reset_from_stage(stage)?;
                Ok(true)
            }
            Err(e) => {
                warn!(stage = name, error = %e, "Unknown stage, reset ignored");
                Ok(false)
            }
        }
    }

    /// Replace the record with a fresh one. Artifact files stay on disk.
    pub fn clear_all(&mut self) -> Result<()> {
        let mut fresh = LedgerRecord::new(self.key());
        self.ledger.persist(&mut fresh)?;
        self.record = fresh;
        info!(key = %self.key(), "Pipeline state cleared");
        Ok(())
    }

    /// Apply `mutate` to a copy of the record, persist it, then adopt it.
    fn commit(&mut self, mutate: impl FnOnce(&mut LedgerRecord)) -> Result<()> {
        let mut next = self.record.clone();
        mutate(&mut next);
        self.ledger.persist(&mut next)?;
        self.record = next;
        Ok(())
    }
}
