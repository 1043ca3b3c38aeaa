//! Stage listing, status, show, use and reset commands.

use anyhow::{Context, Result, bail};
use console::style;
use distill::stage::Stage;
use std::path::Path;

use super::super::{Cli, LessonArgs};
use super::{inspect_lesson, load_config, open_lesson};

pub fn cmd_stages() {
    use distill::agent::AgentRole;

    println!();
    println!("{:<4} {:<22} {:<9} Description", "#", "Stage", "Agent");
    println!(
        "{:<4} {:<22} {:<9} -----------",
        "--", "----------------------", "--------"
    );
    for stage in Stage::ALL {
        println!(
            "{:<4} {:<22} {:<9} {}",
            stage.index() + 1,
            stage.as_str(),
            AgentRole::for_stage(stage).as_str(),
            stage.description()
        );
    }
    println!();
}

pub fn cmd_status(cli: &Cli, project_dir: &Path, lesson: LessonArgs) -> Result<()> {
    let config = load_config(cli, project_dir)?;
    let coordinator = inspect_lesson(&config, lesson)?;
    let record = coordinator.record();

    println!();
    println!("Status for {}", coordinator.key());
    println!("==================================");
    println!();
    println!("Ledger:  {}", coordinator.ledger_path().display());
    println!(
        "Created: {}",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "Updated: {}",
        record.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();

    for stage in Stage::ALL {
        match coordinator.stage_location(stage) {
            Some(location) => {
                let marker = if location.exists() {
                    style("done").green()
                } else {
                    style("missing").red()
                };
                println!(
                    "  {:<22} {:<8} {}",
                    stage.as_str(),
                    marker,
                    style(location.display()).dim()
                );
            }
            None => println!("  {:<22} {}", stage.as_str(), style("pending").dim()),
        }
    }
    println!();

    match coordinator.get_next_stage() {
        Some(stage) => println!(
            "Next stage: {} ({}/{} complete)",
            style(stage).yellow(),
            record.completed_count(),
            Stage::ALL.len()
        ),
        None => println!(
            "{} All stages complete. Handout: {}",
            style("✓").green(),
            coordinator
                .stage_location(Stage::FinalHandout)
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        ),
    }
    println!();
    Ok(())
}

pub fn cmd_show(cli: &Cli, project_dir: &Path, lesson: LessonArgs, stage: Stage) -> Result<()> {
    let config = load_config(cli, project_dir)?;
    let coordinator = inspect_lesson(&config, lesson)?;

    if !coordinator.is_stage_completed(stage) {
        bail!(
            "Stage {} is not complete for {}",
            stage,
            coordinator.key()
        );
    }
    match coordinator.get_stage_output(stage) {
        Some(content) => {
            print!("{}", content);
            if !content.ends_with('\n') {
                println!();
            }
            Ok(())
        }
        None => bail!(
            "Stage {} is marked complete but its artifact cannot be read. Run 'distill reset -m {} -l {} --from {}'",
            stage,
            lesson.module,
            lesson.lesson,
            stage
        ),
    }
}

pub fn cmd_use(
    cli: &Cli,
    project_dir: &Path,
    lesson: LessonArgs,
    stage: Stage,
    path: &Path,
) -> Result<()> {
    let config = load_config(cli, project_dir)?;
    let mut coordinator = open_lesson(&config, lesson)?;

    if !coordinator.use_existing_file(stage, path)? {
        bail!("File not found: {}", path.display());
    }
    let location = coordinator
        .stage_location(stage)
        .context("Stage location missing after registering override")?;
    println!(
        "Stage {} of {} now uses {}",
        style(stage).green(),
        coordinator.key(),
        location.display()
    );
    Ok(())
}

pub fn cmd_reset(
    cli: &Cli,
    project_dir: &Path,
    lesson: LessonArgs,
    from: Option<&str>,
    force: bool,
) -> Result<()> {
    use dialoguer::Confirm;

    let config = load_config(cli, project_dir)?;
    let mut coordinator = open_lesson(&config, lesson)?;

    if let Some(name) = from {
        if !coordinator.reset_from_stage_name(name)? {
            bail!(
                "Unknown stage '{}'. Run 'distill stages' to list valid names",
                name
            );
        }
        println!(
            "Reset {} from {}; next stage: {}",
            coordinator.key(),
            name,
            coordinator
                .get_next_stage()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        return Ok(());
    }

    if !force {
        let confirm = Confirm::new()
            .with_prompt(format!(
                "This will reset all progress for {}. Are you sure?",
                coordinator.key()
            ))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirm {
            println!("Reset cancelled");
            return Ok(());
        }
    }

    coordinator.clear_all()?;
    println!("Reset complete");
    Ok(())
}
