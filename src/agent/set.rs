use anyhow::Result;

use super::{Agent, AgentRole, ChatAgent, LazyAgent};
use crate::credentials::ApiKeys;
use crate::distill_config::DistillToml;
use crate::prompts::{PromptLibrary, PromptTemplate};

/// The three pipeline agents, each built on first use.
pub struct AgentSet {
    teacher: LazyAgent,
    reviewer: LazyAgent,
    editor: LazyAgent,
}

impl AgentSet {
    pub fn new(teacher: LazyAgent, reviewer: LazyAgent, editor: LazyAgent) -> Self {
        Self {
            teacher,
            reviewer,
            editor,
        }
    }

    /// Chat agents configured from `distill.toml`.
    ///
    /// Nothing is validated here: a missing API key or a broken system prompt
    /// surfaces only when a stage actually needs that agent.
    pub fn from_config(toml: &DistillToml, keys: &ApiKeys, prompts: &PromptLibrary) -> Self {
        let build = |role: AgentRole| {
            let settings = toml.agents.for_role(role).clone();
            let base_url = toml.base_url(settings.provider);
            let subject = toml.course.subject.clone();
            let language = toml.course.language.clone();
            let keys = keys.clone();
            let prompts = prompts.clone();

            LazyAgent::new(role, move || {
                let api_key = keys.require(settings.provider)?;
                let system_prompt = prompts.render(
                    system_template(role),
                    &[("subject", &subject), ("language", &language)],
                )?;
                let agent = ChatAgent::new(
                    role.as_str(),
                    &settings.model,
                    &base_url,
                    api_key,
                    system_prompt,
                )?
                .with_temperature(settings.temperature)
                .with_history(settings.history);
                tracing::info!(
                    %role,
                    provider = %settings.provider,
                    model = %settings.model,
                    "Agent ready"
                );
                Ok(Box::new(agent) as Box<dyn Agent>)
            })
        };

        Self::new(
            build(AgentRole::Teacher),
            build(AgentRole::Reviewer),
            build(AgentRole::Editor),
        )
    }

    pub fn for_role(&mut self, role: AgentRole) -> &mut LazyAgent {
        match role {
            AgentRole::Teacher => &mut self.teacher,
            AgentRole::Reviewer => &mut self.reviewer,
            AgentRole::Editor => &mut self.editor,
        }
    }

    /// Get the agent for `role`, building it if needed.
    pub fn agent(&mut self, role: AgentRole) -> Result<&mut Box<dyn Agent>> {
        self.for_role(role).get()
    }

    /// Roles whose agent has been built so far.
    pub fn initialized_roles(&self) -> Vec<AgentRole> {
        [&self.teacher, &self.reviewer, &self.editor]
            .into_iter()
            .filter(|a| a.is_initialized())
            .map(LazyAgent::role)
            .collect()
    }
}

fn system_template(role: AgentRole) -> PromptTemplate {
    match role {
        AgentRole::Teacher => PromptTemplate::SystemTeacher,
        AgentRole::Reviewer => PromptTemplate::SystemReviewer,
        AgentRole::Editor => PromptTemplate::SystemEditor,
    }
}
