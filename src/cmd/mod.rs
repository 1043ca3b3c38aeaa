//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                          |
//! |-----------|-------------------------------------------|
//! | `run`     | `Run`                                     |
//! | `lesson`  | `Status`, `Stages`, `Show`, `Use`, `Reset` |
//! | `project` | `Init`                                    |
//! | `config`  | `Config`                                  |

pub mod config;
pub mod lesson;
pub mod project;
pub mod run;

pub use config::cmd_config;
pub use lesson::{cmd_reset, cmd_show, cmd_stages, cmd_status, cmd_use};
pub use project::cmd_init;
pub use run::cmd_run;

use anyhow::Result;
use distill::config::Config;
use distill::pipeline::Coordinator;
use std::path::Path;

use super::{Cli, LessonArgs};

fn load_config(cli: &Cli, project_dir: &Path) -> Result<Config> {
    Config::new(
        project_dir.to_path_buf(),
        cli.verbose,
        cli.output_dir.clone(),
    )
}

fn open_lesson(config: &Config, lesson: LessonArgs) -> Result<Coordinator> {
    Ok(Coordinator::open(
        lesson.module,
        lesson.lesson,
        &config.output_dir,
    )?)
}

/// Like [`open_lesson`] but never creates directories.
fn inspect_lesson(config: &Config, lesson: LessonArgs) -> Result<Coordinator> {
    Ok(Coordinator::inspect(
        lesson.module,
        lesson.lesson,
        &config.output_dir,
    )?)
}
