use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use distill::stage::Stage;
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "distill")]
#[command(version, about = "Checkpointed pipeline that turns lecture materials into lesson handouts")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Output root for intermediate artifacts and handouts. Overrides distill.toml and DISTILL_OUTPUT_DIR.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Identifies one pipeline instance.
#[derive(Args, Clone, Copy)]
pub struct LessonArgs {
    /// Module number
    #[arg(short, long)]
    pub module: u32,

    /// Lesson number
    #[arg(short, long)]
    pub lesson: u32,
}

#[derive(Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub lesson: LessonArgs,

    /// Reset this stage and all later stages before running
    #[arg(long)]
    pub from: Option<Stage>,

    /// Stop after this stage
    #[arg(long)]
    pub until: Option<Stage>,

    /// Use an existing file as a stage's output (repeatable)
    #[arg(long = "use", value_name = "STAGE=PATH", value_parser = parse_stage_override)]
    pub overrides: Vec<(Stage, PathBuf)>,

    /// Materials directory (defaults to {input_dir}/m{module:03}_l{lesson:03})
    #[arg(long)]
    pub materials: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new distill project
    Init,
    /// Run the pipeline for a lesson, resuming where it stopped
    Run(RunArgs),
    /// Show per-stage progress for a lesson
    Status {
        #[command(flatten)]
        lesson: LessonArgs,
    },
    /// List the pipeline stages in execution order
    Stages,
    /// Print a completed stage's artifact
    Show {
        #[command(flatten)]
        lesson: LessonArgs,
        stage: Stage,
    },
    /// Register an existing file as a stage's output
    Use {
        #[command(flatten)]
        lesson: LessonArgs,
        stage: Stage,
        path: PathBuf,
    },
    /// Reset a lesson's progress
    Reset {
        #[command(flatten)]
        lesson: LessonArgs,
        /// Only reset this stage and the ones after it
        #[arg(long)]
        from: Option<String>,
        /// Skip the confirmation prompt when clearing everything
        #[arg(long)]
        force: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default distill.toml file
    Init,
}

/// Parse `STAGE=PATH`.
fn parse_stage_override(s: &str) -> Result<(Stage, PathBuf), String> {
    let (stage, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected STAGE=PATH, got '{s}'"))?;
    let stage = stage.parse::<Stage>().map_err(|e| e.to_string())?;
    if path.is_empty() {
        return Err(format!("missing path for stage {stage}"));
    }
    Ok((stage, PathBuf::from(path)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    distill::credentials::load_dotenv(&project_dir)?;

    // `run` installs logging itself once the output directory is known.
    let _guard = match &cli.command {
        Commands::Run(_) => None,
        _ => distill::logging::init(cli.verbose, None)?,
    };

    match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Run(args) => cmd::cmd_run(&cli, &project_dir, args).await?,
        Commands::Status { lesson } => cmd::cmd_status(&cli, &project_dir, *lesson)?,
        Commands::Stages => cmd::cmd_stages(),
        Commands::Show { lesson, stage } => cmd::cmd_show(&cli, &project_dir, *lesson, *stage)?,
        Commands::Use {
            lesson,
            stage,
            path,
        } => cmd::cmd_use(&cli, &project_dir, *lesson, *stage, path)?,
        Commands::Reset {
            lesson,
            from,
            force,
        } => cmd::cmd_reset(&cli, &project_dir, *lesson, from.as_deref(), *force)?,
        Commands::Config { command } => cmd::cmd_config(&cli, &project_dir, command.clone())?,
    }

    Ok(())
}
