//! LLM agents used by the handout runner.
//!
//! - [`Agent`]: one chat participant (teacher, reviewer or editor)
//! - [`ChatAgent`]: OpenAI-compatible chat-completions implementation
//! - [`LazyAgent`]: builds its agent on first use, so stages that are already
//!   complete never pay for constructing theirs

pub mod chat;
pub mod set;

pub use chat::{ChatAgent, Message};
pub use set::AgentSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::stage::Stage;

/// Which agent performs a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Teacher,
    Reviewer,
    Editor,
}

impl AgentRole {
    pub const ALL: [AgentRole; 3] = [AgentRole::Teacher, AgentRole::Reviewer, AgentRole::Editor];

    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Review => AgentRole::Reviewer,
            Stage::EditingInstructions => AgentRole::Editor,
            Stage::FirstDraft | Stage::Summary | Stage::HandoutDraft | Stage::FinalHandout => {
                AgentRole::Teacher
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::Teacher => "teacher",
            AgentRole::Reviewer => "reviewer",
            AgentRole::Editor => "editor",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Agent: Send {
    fn name(&self) -> &str;

    /// Send one user prompt and return the reply text.
    async fn chat(&mut self, prompt: &str) -> Result<String>;
}

type AgentFactory = Box<dyn FnOnce() -> Result<Box<dyn Agent>> + Send>;

/// An agent that is only constructed when first asked for.
pub struct LazyAgent {
    role: AgentRole,
    factory: Option<AgentFactory>,
    agent: Option<Box<dyn Agent>>,
}

impl LazyAgent {
    pub fn new(
        role: AgentRole,
        factory: impl FnOnce() -> Result<Box<dyn Agent>> + Send + 'static,
    ) -> Self {
        Self {
            role,
            factory: Some(Box::new(factory)),
            agent: None,
        }
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn is_initialized(&self) -> bool {
        self.agent.is_some()
    }

    /// The agent, building it on the first call.
    ///
    /// If the factory fails the error is returned and later calls fail too.
    pub fn get(&mut self) -> Result<&mut Box<dyn Agent>> {
        if self.agent.is_none() {
            let factory = self.factory.take().ok_or_else(|| {
                anyhow::anyhow!("The {} agent failed to initialize earlier", self.role)
            })?;
            tracing::debug!(role = %self.role, "Initializing agent");
            self.agent = Some(factory()?);
        }
        self.agent
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("The {} agent is unavailable", self.role))
    }
}
