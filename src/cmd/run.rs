//! Pipeline execution command: `distill run`.

use anyhow::{Result, bail};
use std::path::Path;

use super::super::{Cli, RunArgs};
use super::{load_config, open_lesson};

pub async fn cmd_run(cli: &Cli, project_dir: &Path, args: &RunArgs) -> Result<()> {
    use distill::agent::AgentSet;
    use distill::credentials::ApiKeys;
    use distill::pipeline::{HandoutRunner, LessonContext, RunOptions};
    use distill::prompts::PromptLibrary;
    use distill::ui::PipelineUI;

    if let (Some(from), Some(until)) = (args.from, args.until)
        && from > until
    {
        bail!("--from {} comes after --until {}", from, until);
    }

    let config = load_config(cli, project_dir)?;
    config.ensure_directories()?;
    let _guard = distill::logging::init(cli.verbose, Some(&config.log_dir))?;

    for warning in config.toml.validate() {
        tracing::warn!("Config: {}", warning);
    }

    let keys = ApiKeys::from_env();
    tracing::debug!(?keys, "Credentials loaded");

    let prompts = PromptLibrary::new(Some(&config.prompts_dir));
    let agents = AgentSet::from_config(&config.toml, &keys, &prompts);
    let coordinator = open_lesson(&config, args.lesson)?;

    let materials_dir = args
        .materials
        .clone()
        .unwrap_or_else(|| config.materials_dir(coordinator.key()));
    let lesson = LessonContext {
        subject: config.toml.course.subject.clone(),
        language: config.toml.course.language.clone(),
        materials_dir,
    };

    let options = RunOptions {
        from: args.from,
        until: args.until,
        overrides: args.overrides.clone(),
    };

    tracing::info!(
        key = %coordinator.key(),
        output_dir = %config.output_dir.display(),
        "Starting run"
    );
    let mut runner =
        HandoutRunner::new(coordinator, agents, prompts, lesson).with_ui(PipelineUI::new(cli.verbose));
    let summary = runner.run(&options).await?;

    if summary.executed.is_empty() && summary.handout.is_some() {
        println!("All stages already complete. Use `distill reset` to run them again.");
    }

    Ok(())
}
