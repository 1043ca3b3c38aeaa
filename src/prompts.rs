//! Prompt templates for the handout agents.
//!
//! Each template has a built-in default. A file named `<template>.md` in
//! `.distill/prompts/` replaces it, e.g. `.distill/prompts/review.reviewer.md`.
//!
//! Placeholders are written `{name}`. `{{` and `}}` produce literal braces;
//! any other brace (LaTeX, code) is left untouched.
//!
//! Stage prompts embed the upstream artifacts they depend on, so a resumed
//! run produces the same prompt as an uninterrupted one.

use anyhow::{Context, Result, bail};
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    SystemTeacher,
    SystemReviewer,
    SystemEditor,
    SummaryTeacher,
    ReviewReviewer,
    ReviseTeacher,
    NotesTeacher,
    EditingEditor,
    FinalTeacher,
}

impl PromptTemplate {
    pub const ALL: [PromptTemplate; 9] = [
        PromptTemplate::SystemTeacher,
        PromptTemplate::SystemReviewer,
        PromptTemplate::SystemEditor,
        PromptTemplate::SummaryTeacher,
        PromptTemplate::ReviewReviewer,
        PromptTemplate::ReviseTeacher,
        PromptTemplate::NotesTeacher,
        PromptTemplate::EditingEditor,
        PromptTemplate::FinalTeacher,
    ];

    /// Template name; the override file is `<name>.md`.
    pub fn name(self) -> &'static str {
        match self {
            PromptTemplate::SystemTeacher => "system.teacher",
            PromptTemplate::SystemReviewer => "system.reviewer",
            PromptTemplate::SystemEditor => "system.editor",
            PromptTemplate::SummaryTeacher => "summary.teacher",
            PromptTemplate::ReviewReviewer => "review.reviewer",
            PromptTemplate::ReviseTeacher => "revise.teacher",
            PromptTemplate::NotesTeacher => "notes.teacher",
            PromptTemplate::EditingEditor => "editing.editor",
            PromptTemplate::FinalTeacher => "final.teacher",
        }
    }

    fn default_text(self) -> &'static str {
        match self {
            PromptTemplate::SystemTeacher => SYSTEM_TEACHER,
            PromptTemplate::SystemReviewer => SYSTEM_REVIEWER,
            PromptTemplate::SystemEditor => SYSTEM_EDITOR,
            PromptTemplate::SummaryTeacher => SUMMARY_TEACHER,
            PromptTemplate::ReviewReviewer => REVIEW_REVIEWER,
            PromptTemplate::ReviseTeacher => REVISE_TEACHER,
            PromptTemplate::NotesTeacher => NOTES_TEACHER,
            PromptTemplate::EditingEditor => EDITING_EDITOR,
            PromptTemplate::FinalTeacher => FINAL_TEACHER,
        }
    }
}

/// Loads templates, preferring project overrides over the built-in text.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
}

impl PromptLibrary {
    pub fn new(override_dir: Option<&Path>) -> Self {
        Self {
            override_dir: override_dir.map(Path::to_path_buf),
        }
    }

    /// Built-in templates only.
    pub fn builtin() -> Self {
        Self { override_dir: None }
    }

    pub fn override_path(&self, template: PromptTemplate) -> Option<PathBuf> {
        self.override_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.md", template.name())))
    }

    /// Raw template text.
    pub fn load(&self, template: PromptTemplate) -> Result<String> {
        match self.override_path(template) {
            Some(path) if path.is_file() => std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt override: {}", path.display())),
            _ => Ok(template.default_text().to_string()),
        }
    }

    /// Load `template` and fill in its placeholders.
    pub fn render(&self, template: PromptTemplate, vars: &[(&str, &str)]) -> Result<String> {
        let text = self.load(template)?;
        render_template(&text, vars)
            .with_context(|| format!("Failed to render prompt '{}'", template.name()))
    }
}

/// Substitute `{name}` placeholders from `vars`.
pub fn render_template(text: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut missing: Vec<String> = Vec::new();
    let rendered = PLACEHOLDER.replace_all(text, |caps: &Captures| match caps.get(1) {
        None if &caps[0] == "{{" => "{".to_string(),
        None => "}".to_string(),
        Some(name) => match vars.iter().find(|(k, _)| *k == name.as_str()) {
            Some((_, value)) => (*value).to_string(),
            None => {
                if !missing.iter().any(|m| m == name.as_str()) {
                    missing.push(name.as_str().to_string());
                }
                caps[0].to_string()
            }
        },
    });

    if !missing.is_empty() {
        bail!("No value for placeholder(s): {}", missing.join(", "));
    }
    Ok(rendered.into_owned())
}

const SYSTEM_TEACHER: &str = "\
You are an experienced university lecturer in {subject}. You write clear, \
rigorous and well-structured study material for your students. \
Always answer in {language} and format your answers as Markdown.
";

const SYSTEM_REVIEWER: &str = "\
You are a meticulous reviewer of university course material in {subject}. \
You check drafts for factual errors, gaps in coverage and unclear explanations, \
and you give concrete, actionable feedback. Always answer in {language}.
";

const SYSTEM_EDITOR: &str = "\
You are a copy editor for university handouts in {subject}. You check that a \
handout follows the author's instructions on structure, tone and formatting, \
and you list the exact corrections needed. Always answer in {language}.
";

const SUMMARY_TEACHER: &str = "\
# Lesson {lesson_num} summary

Write a detailed summary of lesson {lesson_num} of the {subject} course, based on the \
lecture materials below. Cover every topic in the topic list, in order, and \
explain each one the way you would in class.

## Materials

{materials}

## Topics

{topics}
";

const REVIEW_REVIEWER: &str = "\
The author was given these instructions:

<instructions>
{summary_instructions}
</instructions>

and produced this draft:

<draft>
{summary_draft}
</draft>

Review the draft against the instructions. List factual errors, missing topics, \
and passages that need clearer explanations. Write your review as instructions \
addressed directly to the author.
";

const REVISE_TEACHER: &str = "\
Here is your first draft of the lesson summary:

<draft>
{first_draft}
</draft>

A reviewer sent you the following feedback:

<review>
{review}
</review>

Rewrite the summary applying the feedback. Return the complete revised summary.
";

const NOTES_TEACHER: &str = "\
Using the lesson summary below, write a handout for students. The handout must:

- open with a short overview of the lesson,
- use one section per topic with headings,
- explain formulas in words as well as symbols,
- close with a list of key takeaways.

Write in {language}.

<summary>
{summary}
</summary>
";

const EDITING_EDITOR: &str = "\
The handout author received these instructions:

<instructions>
{instructions}
</instructions>

This is the handout they wrote:

<handout>
{handout}
</handout>

Check the handout against the instructions and list every correction needed. \
If nothing needs to change, say so explicitly.
";

const FINAL_TEACHER: &str = "\
This is your handout:

<handout>
{handout}
</handout>

An editor asked for the following corrections:

<corrections>
{corrections}
</corrections>

Apply the corrections and return the complete final handout, with no commentary.
";
