pub mod generate;
pub mod index;
pub mod init;
pub mod plan;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;

use scribe_core::config::ScribeConfig;
use scribe_core::pipeline::ScribePipeline;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default .scribe/config.toml into a Java project
    Init(init::InitArgs),
    /// Build and print the project's symbol index
    Index(index::IndexArgs),
    /// Analyze and classify every source file without generating tests
    Plan(plan::PlanArgs),
    /// Generate, verify and write tests for every eligible source file
    Generate(generate::GenerateArgs),
}

pub async fn run(cmd: Command, quiet: bool) -> anyhow::Result<()> {
    match cmd {
        Command::Init(args) => init::run(&args),
        Command::Index(args) => index::run(&args),
        Command::Plan(args) => plan::run(&args),
        Command::Generate(args) => generate::run(args, quiet).await,
    }
}

/// Some files failed while the rest of the run completed.
#[derive(Debug)]
pub struct PartialSuccess {
    pub failed: usize,
    pub total: usize,
}

impl std::fmt::Display for PartialSuccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} files failed; see the summary above",
            self.failed, self.total
        )
    }
}

impl std::error::Error for PartialSuccess {}

pub(crate) fn resolve_root(path: &Path) -> anyhow::Result<PathBuf> {
    std::fs::canonicalize(path)
        .with_context(|| format!("Cannot resolve path: {}", path.display()))
}

/// Load config and open the pipeline for a project root.
pub(crate) fn open_pipeline(path: &Path) -> anyhow::Result<ScribePipeline> {
    let root = resolve_root(path)?;
    let config = ScribeConfig::load(&root)
        .with_context(|| format!("Cannot load config for {}", root.display()))?;
    ScribePipeline::new(&root, config)
        .with_context(|| format!("Cannot open project {}", root.display()))
}

pub(crate) fn parse_only(only: Option<&str>) -> anyhow::Result<Option<glob::Pattern>> {
    only.map(|p| glob::Pattern::new(p).with_context(|| format!("Invalid --only pattern: {p}")))
        .transpose()
}
