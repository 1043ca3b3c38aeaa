//! Configuration view and validation commands: `distill config`.

use anyhow::Result;
use std::path::Path;

use super::super::{Cli, ConfigCommands};
use super::load_config;

pub fn cmd_config(cli: &Cli, project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    use distill::agent::AgentRole;
    use distill::credentials::ApiKeys;
    use distill::distill_config::{CONFIG_FILE, DistillToml, Provider};
    use distill::init::get_distill_dir;

    let distill_dir = get_distill_dir(project_dir);
    let config_path = distill_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Distill Configuration");
            println!("=====================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No distill.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            let config = load_config(cli, project_dir)?;
            let toml = &config.toml;

            println!("[course]");
            println!("  subject = \"{}\"", toml.course.subject);
            println!("  language = \"{}\"", toml.course.language);
            println!();

            for role in AgentRole::ALL {
                let agent = toml.agents.for_role(role);
                println!("[agents.{}]", role);
                println!("  provider = \"{}\"", agent.provider);
                println!("  model = \"{}\"", agent.model);
                println!("  temperature = {}", agent.temperature);
                println!("  history = {}", agent.history);
                println!("  base_url = \"{}\"", toml.base_url(agent.provider));
                println!();
            }

            println!("Effective paths (with env/CLI overrides):");
            println!("  input_dir = \"{}\"", config.input_dir.display());
            println!("  output_dir = \"{}\"", config.output_dir.display());
            println!("  prompts_dir = \"{}\"", config.prompts_dir.display());
            println!();

            println!("API keys:");
            let keys = ApiKeys::from_env();
            for provider in Provider::ALL {
                let status = match keys.preview(provider) {
                    Some(preview) => format!("set ({}...)", preview),
                    None => "not set".to_string(),
                };
                println!("  {:<18} {}", provider.api_key_env(), status);
            }
            println!();

            if !config_path.exists() {
                println!("Run 'distill config init' to create a distill.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No distill.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = DistillToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("distill.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !distill_dir.exists() {
                std::fs::create_dir_all(&distill_dir)?;
            }

            DistillToml::default().save(&config_path)?;

            println!("Created distill.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [course] subject, language");
            println!("  - [paths] input_dir, output_dir");
            println!("  - [agents.teacher|reviewer|editor] provider, model, temperature, history");
            println!("  - [providers.<name>] base_url");
            println!();
        }
    }

    Ok(())
}
