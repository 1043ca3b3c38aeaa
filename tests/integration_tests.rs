//! Integration tests for distill
//!
//! These drive the binary end to end. None of them reach a provider: every
//! run either stops before an agent is needed or has all stages supplied
//! through `--use`.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const STAGES: [&str; 6] = [
    "first_draft",
    "review",
    "summary",
    "handout_draft",
    "editing_instructions",
    "final_handout",
];

/// Helper to create a distill Command isolated from the caller's environment
fn distill(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("distill");
    cmd.current_dir(dir.path())
        .env_remove("DISTILL_OUTPUT_DIR")
        .env_remove("RUST_LOG");
    for var in [
        "OPENAI_API_KEY",
        "GOOGLE_API_KEY",
        "ANTHROPIC_API_KEY",
        "DEEPSEEK_API_KEY",
        "GROQ_API_KEY",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Helper to create a temporary project directory
fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

/// Helper to initialize a distill project in a temp directory
fn init_project(dir: &TempDir) {
    distill(dir).arg("init").assert().success();
}

fn ledger_path(dir: &TempDir) -> PathBuf {
    dir.path()
        .join("data/output/intermediate/lesson_001_009_state.json")
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_distill_help() {
        let dir = create_temp_project();
        distill(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("run"))
            .stdout(predicate::str::contains("reset"));
    }

    #[test]
    fn test_distill_version() {
        let dir = create_temp_project();
        distill(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("distill"));
    }

    #[test]
    fn test_init_creates_structure() {
        let dir = create_temp_project();

        distill(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized distill project"));

        assert!(dir.path().join(".distill/distill.toml").is_file());
        assert!(dir.path().join(".distill/prompts").is_dir());
        assert!(dir.path().join("data/input").is_dir());
        assert!(dir.path().join("data/output").is_dir());
    }

    #[test]
    fn test_init_idempotent() {
        let dir = create_temp_project();
        init_project(&dir);

        distill(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already initialized"));
    }

    #[test]
    fn test_stages_lists_catalog_in_order() {
        let dir = create_temp_project();
        let output = distill(&dir).arg("stages").output().unwrap();
        assert!(output.status.success());

        let stdout = String::from_utf8(output.stdout).unwrap();
        let positions: Vec<usize> = STAGES
            .iter()
            .map(|s| stdout.find(s).expect("stage listed"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(stdout.contains("reviewer"));
        assert!(stdout.contains("editor"));
    }

    #[test]
    fn test_unknown_stage_argument_rejected() {
        let dir = create_temp_project();
        distill(&dir)
            .args(["show", "-m", "1", "-l", "9", "conclusion"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown stage"));
    }
}

// =============================================================================
// Status / use / show / reset
// =============================================================================

mod lesson_state {
    use super::*;

    #[test]
    fn test_status_fresh_lesson() {
        let dir = create_temp_project();
        init_project(&dir);

        distill(&dir)
            .args(["status", "-m", "1", "-l", "9"])
            .assert()
            .success()
            .stdout(predicate::str::contains("module 001 lesson 009"))
            .stdout(predicate::str::contains("pending"))
            .stdout(predicate::str::contains("Next stage: first_draft"));
    }

    #[test]
    fn test_use_then_status_and_show() {
        let dir = create_temp_project();
        init_project(&dir);
        let draft = write_file(dir.path(), "draft.md", "# My own draft\n");

        distill(&dir)
            .args(["use", "-m", "1", "-l", "9", "first_draft"])
            .arg(&draft)
            .assert()
            .success()
            .stdout(predicate::str::contains("now uses"));

        distill(&dir)
            .args(["status", "-m", "1", "-l", "9"])
            .assert()
            .success()
            .stdout(predicate::str::contains("done"))
            .stdout(predicate::str::contains("Next stage: review"));

        distill(&dir)
            .args(["show", "-m", "1", "-l", "9", "first-draft"])
            .assert()
            .success()
            .stdout(predicate::str::contains("# My own draft"));

        let ledger = fs::read_to_string(ledger_path(&dir)).unwrap();
        assert!(ledger.contains("\"completed_stages\""));
        assert!(ledger.contains("first_draft"));
    }

    #[test]
    fn test_use_missing_file_fails() {
        let dir = create_temp_project();
        init_project(&dir);

        distill(&dir)
            .args(["use", "-m", "1", "-l", "9", "review", "nope.md"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("File not found"));
    }

    #[test]
    fn test_show_incomplete_stage_fails() {
        let dir = create_temp_project();
        init_project(&dir);

        distill(&dir)
            .args(["show", "-m", "1", "-l", "9", "summary"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not complete"));
    }

    #[test]
    fn test_reset_from_cascades() {
        let dir = create_temp_project();
        init_project(&dir);
        for stage in ["first_draft", "review", "summary"] {
            let file = write_file(dir.path(), &format!("{stage}.md"), stage);
            distill(&dir)
                .args(["use", "-m", "1", "-l", "9", stage])
                .arg(&file)
                .assert()
                .success();
        }

        distill(&dir)
            .args(["reset", "-m", "1", "-l", "9", "--from", "review"])
            .assert()
            .success()
            .stdout(predicate::str::contains("next stage: review"));

        distill(&dir)
            .args(["status", "-m", "1", "-l", "9"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Next stage: review (1/6 complete)"));
    }

    #[test]
    fn test_reset_unknown_stage_leaves_ledger_untouched() {
        let dir = create_temp_project();
        init_project(&dir);
        let file = write_file(dir.path(), "draft.md", "draft");
        distill(&dir)
            .args(["use", "-m", "1", "-l", "9", "first_draft"])
            .arg(&file)
            .assert()
            .success();
        let before = fs::read_to_string(ledger_path(&dir)).unwrap();

        distill(&dir)
            .args(["reset", "-m", "1", "-l", "9", "--from", "conclusion"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown stage 'conclusion'"));

        assert_eq!(fs::read_to_string(ledger_path(&dir)).unwrap(), before);
    }

    #[test]
    fn test_reset_force_clears_but_keeps_files() {
        let dir = create_temp_project();
        init_project(&dir);
        let file = write_file(dir.path(), "draft.md", "draft");
        distill(&dir)
            .args(["use", "-m", "1", "-l", "9", "first_draft"])
            .arg(&file)
            .assert()
            .success();

        distill(&dir)
            .args(["reset", "-m", "1", "-l", "9", "--force"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Reset complete"));

        assert!(file.exists());
        distill(&dir)
            .args(["status", "-m", "1", "-l", "9"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Next stage: first_draft (0/6 complete)"));
    }

    #[test]
    fn test_status_creates_no_directories() {
        let dir = create_temp_project();

        distill(&dir)
            .args(["--output-dir", "typo_out", "status", "-m", "1", "-l", "9"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Next stage: first_draft"));
        assert!(!dir.path().join("typo_out").exists());
    }

    #[test]
    fn test_output_dir_flag_and_env() {
        let dir = create_temp_project();
        init_project(&dir);
        let file = write_file(dir.path(), "draft.md", "draft");

        distill(&dir)
            .args(["--output-dir", "custom", "use", "-m", "1", "-l", "9", "first_draft"])
            .arg(&file)
            .assert()
            .success();
        assert!(
            dir.path()
                .join("custom/intermediate/lesson_001_009_state.json")
                .is_file()
        );

        distill(&dir)
            .env("DISTILL_OUTPUT_DIR", "from_env")
            .args(["status", "-m", "1", "-l", "9"])
            .assert()
            .success()
            .stdout(predicate::str::contains("from_env"));
    }
}

// =============================================================================
// Run
// =============================================================================

mod run {
    use super::*;

    #[test]
    fn test_run_without_materials_fails_before_any_agent() {
        let dir = create_temp_project();
        init_project(&dir);

        distill(&dir)
            .args(["run", "-m", "1", "-l", "9"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Materials directory not found"));

        assert!(dir.path().join("data/output/logs/distill.log").exists());
    }

    #[test]
    fn test_run_with_every_stage_supplied() {
        let dir = create_temp_project();
        init_project(&dir);

        let mut cmd = distill(&dir);
        cmd.args(["run", "-m", "1", "-l", "9"]);
        for stage in STAGES {
            let file = write_file(dir.path(), &format!("{stage}.md"), stage);
            cmd.arg("--use").arg(format!("{}={}", stage, file.display()));
        }
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("All stages already complete"));

        distill(&dir)
            .args(["show", "-m", "1", "-l", "9", "final_handout"])
            .assert()
            .success()
            .stdout(predicate::str::contains("final_handout"));
    }

    #[test]
    fn test_run_until_satisfied_by_override() {
        let dir = create_temp_project();
        init_project(&dir);
        let draft = write_file(dir.path(), "draft.md", "draft");

        distill(&dir)
            .args(["run", "-m", "1", "-l", "9", "--until", "first_draft", "--use"])
            .arg(format!("first_draft={}", draft.display()))
            .assert()
            .success();
    }

    #[test]
    fn test_run_missing_override_fails() {
        let dir = create_temp_project();
        init_project(&dir);

        distill(&dir)
            .args(["run", "-m", "1", "-l", "9", "--use", "review=missing.md"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("does not exist"));
    }

    #[test]
    fn test_run_from_after_until_rejected() {
        let dir = create_temp_project();
        init_project(&dir);

        distill(&dir)
            .args(["run", "-m", "1", "-l", "9", "--from", "summary", "--until", "review"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("comes after"));
    }

    #[test]
    fn test_run_needs_key_only_when_agent_runs() {
        let dir = create_temp_project();
        init_project(&dir);
        let materials = dir.path().join("data/input/m001_l009");
        fs::create_dir_all(&materials).unwrap();
        write_file(&materials, "slides.pdf", "%PDF");

        distill(&dir)
            .args(["run", "-m", "1", "-l", "9"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("GOOGLE_API_KEY"));

        // Nothing was completed by the failed stage.
        distill(&dir)
            .args(["status", "-m", "1", "-l", "9"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Next stage: first_draft"));
    }
}

// =============================================================================
// Config
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_temp_project();

        distill(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No distill.toml found"))
            .stdout(predicate::str::contains("gemini-2.5-flash"))
            .stdout(predicate::str::contains("OPENAI_API_KEY"))
            .stdout(predicate::str::contains("not set"));
    }

    #[test]
    fn test_config_show_masks_keys() {
        let dir = create_temp_project();
        init_project(&dir);

        distill(&dir)
            .env("OPENAI_API_KEY", "sk-proj-abcdefghijklmnop")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("sk-proj-"))
            .stdout(predicate::str::contains("abcdefghijklmnop").not());
    }

    #[test]
    fn test_project_dotenv_applies_before_config() {
        let dir = create_temp_project();
        let project = dir.path().join("course");
        fs::create_dir_all(&project).unwrap();
        fs::write(
            project.join(".env"),
            "DISTILL_OUTPUT_DIR=env_file_out\nGROQ_API_KEY=gsk_from_dotenv\n",
        )
        .unwrap();

        distill(&dir)
            .arg("--project-dir")
            .arg(&project)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("env_file_out"))
            .stdout(predicate::str::contains("set (gsk_...)"));
    }

    #[test]
    fn test_malformed_dotenv_is_reported() {
        let dir = create_temp_project();
        fs::write(dir.path().join(".env"), "NOT A VALID LINE\n").unwrap();

        distill(&dir)
            .arg("stages")
            .assert()
            .failure()
            .stderr(predicate::str::contains(".env"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = create_temp_project();
        init_project(&dir);
        fs::write(
            dir.path().join(".distill/distill.toml"),
            "[agents.reviewer]\nprovider = \"openai\"\nmodel = \"\"\ntemperature = 3.5\n",
        )
        .unwrap();

        distill(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("agents.reviewer.model is empty"))
            .stdout(predicate::str::contains("temperature"));
    }

    #[test]
    fn test_config_init_does_not_overwrite() {
        let dir = create_temp_project();
        distill(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created distill.toml"));

        distill(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = create_temp_project();
        init_project(&dir);
        fs::write(dir.path().join(".distill/distill.toml"), "[course\n").unwrap();

        distill(&dir)
            .args(["status", "-m", "1", "-l", "9"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse distill.toml"));
    }
}
