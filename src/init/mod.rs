//! Initialization module for distill projects.
//!
//! `distill init` creates the `.distill/` directory plus the default input and
//! output directories:
//!
//! ```text
//! .distill/
//! ├── distill.toml     # Course, paths and agent settings
//! └── prompts/         # Optional prompt overrides (<template>.md)
//! data/
//! ├── input/           # Lesson materials, one m{module}_l{lesson}/ per lesson
//! └── output/
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::distill_config::{CONFIG_FILE, DistillToml};

/// The name of the distill configuration directory.
pub const DISTILL_DIR: &str = ".distill";

/// Result of initializing a distill project.
#[derive(Debug)]
pub struct InitResult {
    /// Path to the `.distill` directory
    pub distill_dir: PathBuf,
    /// Whether the directory was newly created (false if it already existed)
    pub created: bool,
    /// Whether a default `distill.toml` was written
    pub wrote_config: bool,
}

/// Initialize a distill project in the given directory.
///
/// Safe to run repeatedly: missing pieces are created, existing files are
/// never overwritten.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let distill_dir = project_dir.join(DISTILL_DIR);
    let created = !distill_dir.exists();

    std::fs::create_dir_all(&distill_dir)
        .with_context(|| format!("Failed to create directory: {}", distill_dir.display()))?;

    let prompts_dir = distill_dir.join("prompts");
    std::fs::create_dir_all(&prompts_dir).with_context(|| {
        format!(
            "Failed to create prompts directory: {}",
            prompts_dir.display()
        )
    })?;

    let config_path = distill_dir.join(CONFIG_FILE);
    let wrote_config = !config_path.exists();
    if wrote_config {
        DistillToml::default().save(&config_path)?;
    }

    // Data directories come from the (possibly pre-existing) config.
    let toml = DistillToml::load(&config_path)?;
    for dir in [&toml.paths.input_dir, &toml.paths.output_dir] {
        let path = project_dir.join(dir);
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }

    Ok(InitResult {
        distill_dir,
        created,
        wrote_config,
    })
}

/// Check if a project is already initialized with distill.
pub fn is_initialized(project_dir: &Path) -> bool {
    project_dir.join(DISTILL_DIR).exists()
}

/// Get the path to the distill directory for a project.
pub fn get_distill_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(DISTILL_DIR)
}
