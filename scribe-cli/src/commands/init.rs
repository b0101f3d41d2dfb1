use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use scribe_core::config::ScribeConfig;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path to the Java project (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &InitArgs) -> anyhow::Result<()> {
    let root = super::resolve_root(&args.path)?;
    let config_path = ScribeConfig::path_for(&root);

    if config_path.exists() && !args.force {
        anyhow::bail!(
            "Scribe config already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let text = ScribeConfig::default()
        .to_toml()
        .context("Cannot serialize default config")?;
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create {}", dir.display()))?;
    }
    std::fs::write(&config_path, text)
        .with_context(|| format!("Cannot write config: {}", config_path.display()))?;

    println!("Wrote {}", config_path.display());
    println!();
    println!("  Set the API key named by llm.api_key_env before running `scribe generate`.");
    Ok(())
}
