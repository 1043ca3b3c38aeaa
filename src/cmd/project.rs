//! Project initialization command.

use anyhow::Result;

pub fn cmd_init(project_dir: &std::path::Path) -> Result<()> {
    use distill::init::init_project;

    let result = init_project(project_dir)?;

    if result.created {
        println!(
            "Initialized distill project at {}",
            result.distill_dir.display()
        );
        println!();
        println!("Created directory structure:");
        println!("  .distill/");
        println!("  ├── distill.toml  # Course, paths and agent settings");
        println!("  └── prompts/      # Prompt overrides (<template>.md)");
        println!();
        println!("Next steps:");
        println!("  1. Put the API keys for your providers in .env");
        println!("  2. Copy lesson materials to data/input/m001_l001/ (PDFs + topics.txt)");
        println!("  3. Run `distill run -m 1 -l 1`");
    } else {
        println!(
            "Distill project already initialized at {}",
            result.distill_dir.display()
        );
        if result.wrote_config {
            println!("Created missing distill.toml.");
        }
        println!("Directory structure verified.");
    }

    Ok(())
}
