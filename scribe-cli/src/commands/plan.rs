use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use scribe_core::strategy::TestStrategy;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the Java project (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,

    /// Only consider files matching this glob (relative to the source root)
    #[arg(long)]
    pub only: Option<String>,
}

pub fn run(args: &PlanArgs) -> anyhow::Result<()> {
    let pipeline = super::open_pipeline(&args.path)?;
    let only = super::parse_only(args.only.as_deref())?;
    let plan = pipeline
        .plan(only.as_ref())
        .context("Cannot plan generation run")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!(
        "Plan for {} ({} files, {} indexed types)",
        pipeline.project_root().display(),
        plan.files.len(),
        plan.symbols
    );
    println!();
    for entry in &plan.files {
        let detail = match &entry.strategy {
            TestStrategy::Skip(reason) => format!("skip ({reason})"),
            TestStrategy::MockDependencyStrategy(targets) if !targets.is_empty() => {
                let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
                format!("mock [{}]", names.join(", "))
            }
            other => other.label().to_string(),
        };
        println!(
            "  {:<50} {:<12} {detail}",
            entry.file,
            entry.stereotype.as_str()
        );
        for warning in &entry.warnings {
            println!("      warning: {warning}");
        }
    }

    if !plan.collisions.is_empty() {
        println!();
        println!(
            "  {} simple-name collision(s); run `scribe index` for details.",
            plan.collisions.len()
        );
    }
    Ok(())
}
