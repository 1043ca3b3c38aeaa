use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::distill_config::DistillToml;
use crate::init::DISTILL_DIR;
use crate::pipeline::LedgerKey;

/// Environment variable that overrides `paths.output_dir`.
pub const OUTPUT_DIR_ENV: &str = "DISTILL_OUTPUT_DIR";

/// Runtime configuration for distill.
///
/// Bridges `distill.toml` with the runtime needs of the commands: resolves
/// relative paths against the project directory and applies the
/// file → environment → CLI layering for the output directory.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub distill_dir: PathBuf,
    pub prompts_dir: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    pub verbose: bool,
    pub toml: DistillToml,
}

impl Config {
    /// Load configuration for `project_dir`, reading the output override from the environment.
    pub fn new(project_dir: PathBuf, verbose: bool, output_dir: Option<PathBuf>) -> Result<Self> {
        Self::with_env(project_dir, verbose, output_dir, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::new`] with an explicit environment lookup.
    pub fn with_env(
        project_dir: PathBuf,
        verbose: bool,
        output_dir: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let distill_dir = project_dir.join(DISTILL_DIR);
        let toml = DistillToml::load_or_default(&distill_dir)?;

        let output_dir = output_dir
            .or_else(|| env(OUTPUT_DIR_ENV).filter(|v| !v.is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(&toml.paths.output_dir));
        let output_dir = resolve(&project_dir, &output_dir);
        let input_dir = resolve(&project_dir, Path::new(&toml.paths.input_dir));

        Ok(Self {
            prompts_dir: distill_dir.join("prompts"),
            log_dir: output_dir.join("logs"),
            project_dir,
            distill_dir,
            input_dir,
            output_dir,
            verbose,
            toml,
        })
    }

    /// Default materials directory for a lesson: `{input_dir}/m{module:03}_l{lesson:03}`.
    pub fn materials_dir(&self, key: LedgerKey) -> PathBuf {
        self.input_dir
            .join(format!("m{:03}_l{:03}", key.module, key.lesson))
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir).context("Failed to create output directory")?;
        std::fs::create_dir_all(&self.log_dir).context("Failed to create log directory")?;
        Ok(())
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
