use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use scribe_core::llm::providers;
use scribe_core::pipeline::FileStatus;
use scribe_core::progress::IndicatifReporter;
use scribe_core::verify::CommandVerifier;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Path to the Java project (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Only process files matching this glob (relative to the source root)
    #[arg(long)]
    pub only: Option<String>,
}

pub async fn run(args: GenerateArgs, quiet: bool) -> anyhow::Result<()> {
    let pipeline = super::open_pipeline(&args.path)?;
    let only = super::parse_only(args.only.as_deref())?;
    let config = pipeline.config();

    // No credential, no run.
    let provider = providers::from_config(&config.llm).context("Cannot create LLM provider")?;
    let verifier = CommandVerifier::from_config(pipeline.project_root(), &config.verify);
    info!(provider = provider.name(), model = provider.model_id(), "Provider ready");

    let progress = if args.json || quiet {
        IndicatifReporter::hidden()
    } else {
        IndicatifReporter::new()
    };
    let report = pipeline
        .run(provider.as_ref(), &verifier, &progress, only.as_ref())
        .await
        .context("Generation run failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Scribe run {} in {}", report.run_id, pipeline.project_root().display());
        println!();
        for file in &report.files {
            match &file.status {
                FileStatus::Generated { test_path } => println!(
                    "  ok      {:<50} -> {} ({} attempt{})",
                    file.file,
                    test_path.display(),
                    file.attempts,
                    if file.attempts == 1 { "" } else { "s" }
                ),
                FileStatus::Skipped { reason } => {
                    println!("  skip    {:<50} {reason}", file.file);
                }
                FileStatus::Failed { stage, error } => {
                    println!("  FAILED  {:<50} [{stage}] {error}", file.file);
                }
            }
        }
        println!();
        println!("  Generated: {}", report.generated());
        println!("  Skipped:   {}", report.skipped());
        println!("  Failed:    {}", report.failed());
        println!(
            "  Tokens:    {} in / {} out",
            report.usage.input_tokens, report.usage.output_tokens
        );
        println!("  Duration:  {:.2}s", report.duration_ms as f64 / 1000.0);
    }

    if report.is_partial() {
        return Err(super::PartialSuccess {
            failed: report.failed(),
            total: report.files.len(),
        }
        .into());
    }
    Ok(())
}
