//! Runs the six handout stages for one lesson, resuming from the ledger.
//!
//! Stages already marked complete are never re-run: their artifacts are read
//! back from disk when a later stage needs them. Agents are only built for
//! stages that actually execute.

use anyhow::Context;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use super::coordinator::Coordinator;
use crate::agent::{AgentRole, AgentSet};
use crate::errors::PipelineError;
use crate::materials::Materials;
use crate::prompts::{PromptLibrary, PromptTemplate};
use crate::stage::Stage;
use crate::ui::PipelineUI;

pub type Result<T> = std::result::Result<T, PipelineError>;

const NO_TOPICS: &str = "(no topic list provided; cover the materials in order)";
const SUMMARY_PLACEHOLDER: &str = "(the lesson summary you were given)";

/// What a run should do beyond "finish whatever is left".
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Reset this stage and everything after it before running.
    pub from: Option<Stage>,
    /// Stop after this stage completes.
    pub until: Option<Stage>,
    /// Existing files to register as stage outputs before running.
    pub overrides: Vec<(Stage, PathBuf)>,
}

/// Course-level values that feed the prompts.
#[derive(Debug, Clone)]
pub struct LessonContext {
    pub subject: String,
    pub language: String,
    pub materials_dir: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Stages run by this invocation, in order
    pub executed: Vec<Stage>,
    /// Stages that were already complete and were skipped
    pub skipped: Vec<Stage>,
    /// Final handout location, once that stage is complete
    pub handout: Option<PathBuf>,
}

pub struct HandoutRunner {
    coordinator: Coordinator,
    agents: AgentSet,
    prompts: PromptLibrary,
    lesson: LessonContext,
    ui: Option<PipelineUI>,
}

impl HandoutRunner {
    pub fn new(
        coordinator: Coordinator,
        agents: AgentSet,
        prompts: PromptLibrary,
        lesson: LessonContext,
    ) -> Self {
        Self {
            coordinator,
            agents,
            prompts,
            lesson,
            ui: None,
        }
    }

    pub fn with_ui(mut self, ui: PipelineUI) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn agents(&self) -> &AgentSet {
        &self.agents
    }

    /// Apply `options`, then execute every incomplete stage in order.
    pub async fn run(&mut self, options: &RunOptions) -> Result<RunSummary> {
        self.prepare(options)?;

        let mut summary = RunSummary {
            skipped: self.coordinator.completed_stages(),
            ..RunSummary::default()
        };
        if let Some(ui) = &self.ui {
            let key = self.coordinator.key();
            ui.print_header(key.module, key.lesson, &self.lesson.subject);
            ui.set_completed(summary.skipped.len() as u64);
            for stage in &summary.skipped {
                ui.stage_skipped(*stage);
            }
        }

        while let Some(stage) = self.coordinator.get_next_stage() {
            if options.until.is_some_and(|until| stage > until) {
                info!(%stage, "Stopping before stage (--until reached)");
                break;
            }

            let started = Instant::now();
            match self.execute(stage).await {
                Ok(path) => {
                    if let Some(ui) = &self.ui {
                        ui.stage_complete(stage, &path, started);
                    }
                    summary.executed.push(stage);
                }
                Err(e) => {
                    if let Some(ui) = &self.ui {
                        ui.stage_failed(stage, &e.to_string());
                    }
                    return Err(e);
                }
            }
        }

        summary.handout = self
            .coordinator
            .stage_location(Stage::FinalHandout)
            .map(|p| p.to_path_buf());
        if let Some(ui) = &self.ui {
            ui.finish(summary.handout.as_deref());
        }
        info!(
            key = %self.coordinator.key(),
            executed = summary.executed.len(),
            skipped = summary.skipped.len(),
            "Run finished"
        );
        Ok(summary)
    }

    /// Reset and register overrides. Every override path is checked before
    /// the ledger is touched, so a bad `--use` leaves it as it was.
    /// Overrides are applied after the reset so `--from X --use X=file` keeps
    /// the file.
    fn prepare(&mut self, options: &RunOptions) -> Result<()> {
        if let Some((stage, path)) = options
            .overrides
            .iter()
            .find(|(_, path)| !path.is_file())
        {
            return Err(PipelineError::OverrideNotFound {
                stage: *stage,
                path: path.clone(),
            });
        }

        if let Some(from) = options.from {
            self.coordinator.reset_from_stage(from)?;
        }
        for (stage, path) in &options.overrides {
            if !self.coordinator.use_existing_file(*stage, path)? {
                return Err(PipelineError::OverrideNotFound {
                    stage: *stage,
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }

    async fn execute(&mut self, stage: Stage) -> Result<PathBuf> {
        let role = AgentRole::for_stage(stage);
        info!(%stage, %role, "Running stage");
        if let Some(ui) = &self.ui {
            ui.start_stage(stage, role.as_str());
        }

        let prompt = self.stage_prompt(stage)?;
        let reply = self
            .call_agent(role, &prompt)
            .await
            .map_err(|source| PipelineError::StageFailed { stage, source })?;

        let explicit = (stage == Stage::FinalHandout).then(|| self.coordinator.handout_file());
        let path = self
            .coordinator
            .save_stage_output(stage, &reply, explicit.as_deref())?;
        Ok(path)
    }

    async fn call_agent(&mut self, role: AgentRole, prompt: &str) -> anyhow::Result<String> {
        let agent = self.agents.agent(role)?;
        agent.chat(prompt).await
    }

    /// Build the prompt for `stage` from its upstream artifacts.
    fn stage_prompt(&self, stage: Stage) -> Result<String> {
        let prompt = match stage {
            Stage::FirstDraft => self.summary_instructions(true)?,
            Stage::Review => {
                let draft = self.upstream(Stage::FirstDraft)?;
                let instructions = self.summary_instructions(false)?;
                self.prompts.render(
                    PromptTemplate::ReviewReviewer,
                    &[
                        ("summary_instructions", &instructions),
                        ("summary_draft", &draft),
                    ],
                )?
            }
            Stage::Summary => {
                let draft = self.upstream(Stage::FirstDraft)?;
                let review = self.upstream(Stage::Review)?;
                self.prompts.render(
                    PromptTemplate::ReviseTeacher,
                    &[("first_draft", &draft), ("review", &review)],
                )?
            }
            Stage::HandoutDraft => {
                let summary = self.upstream(Stage::Summary)?;
                self.prompts.render(
                    PromptTemplate::NotesTeacher,
                    &[("language", &self.lesson.language), ("summary", &summary)],
                )?
            }
            Stage::EditingInstructions => {
                let handout = self.upstream(Stage::HandoutDraft)?;
                let instructions = self.prompts.render(
                    PromptTemplate::NotesTeacher,
                    &[
                        ("language", &self.lesson.language),
                        ("summary", SUMMARY_PLACEHOLDER),
                    ],
                )?;
                self.prompts.render(
                    PromptTemplate::EditingEditor,
                    &[("instructions", &instructions), ("handout", &handout)],
                )?
            }
            Stage::FinalHandout => {
                let handout = self.upstream(Stage::HandoutDraft)?;
                let corrections = self.upstream(Stage::EditingInstructions)?;
                self.prompts.render(
                    PromptTemplate::FinalTeacher,
                    &[("handout", &handout), ("corrections", &corrections)],
                )?
            }
        };
        Ok(prompt)
    }

    /// The first-draft instructions.
    ///
    /// With `strict`, the materials must be present. Otherwise (when the
    /// reviewer is shown what the author was asked) missing materials are
    /// described instead, since the first draft may have come from a file.
    fn summary_instructions(&self, strict: bool) -> Result<String> {
        let key = self.coordinator.key();
        let (contents, topics) = match Materials::discover(&self.lesson.materials_dir) {
            Ok(materials) => {
                let topics = materials.topics()?.unwrap_or_else(|| NO_TOPICS.to_string());
                (materials.contents(), topics)
            }
            Err(e) if strict => {
                return Err(e
                    .context(format!("Failed to load materials for lesson {key}"))
                    .into());
            }
            Err(e) => {
                warn!(error = %e, "Materials unavailable, describing them generically");
                (
                    "(the lecture materials for this lesson)".to_string(),
                    NO_TOPICS.to_string(),
                )
            }
        };

        let lesson_num = key.lesson.to_string();
        let prompt = self
            .prompts
            .render(
                PromptTemplate::SummaryTeacher,
                &[
                    ("lesson_num", &lesson_num),
                    ("subject", &self.lesson.subject),
                    ("materials", &contents),
                    ("topics", &topics),
                ],
            )
            .context("Failed to build first-draft prompt")?;
        Ok(prompt)
    }

    fn upstream(&self, stage: Stage) -> Result<String> {
        self.coordinator
            .get_stage_output(stage)
            .ok_or(PipelineError::MissingArtifact { stage })
    }
}
