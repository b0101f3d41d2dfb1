use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Path to the Java project (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Print the index as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &IndexArgs) -> anyhow::Result<()> {
    let pipeline = super::open_pipeline(&args.path)?;
    let index = pipeline
        .build_index()
        .context("Cannot build symbol index")?;

    if args.json {
        let symbols: serde_json::Map<String, serde_json::Value> = index
            .iter()
            .map(|(simple, qualified)| (simple.to_string(), serde_json::json!(qualified)))
            .collect();
        let output = serde_json::json!({
            "symbols": symbols,
            "collisions": index.collisions(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "Symbol index for {} ({} types)",
        pipeline.source_root().display(),
        index.len()
    );
    println!();
    for (simple, qualified) in index.iter() {
        println!("  {simple:<30} {qualified}");
    }

    let collisions = index.collisions();
    if !collisions.is_empty() {
        println!();
        println!("  Collisions ({}):", collisions.len());
        for collision in collisions {
            println!(
                "    {} -> {} (candidates: {})",
                collision.simple_name,
                collision.qualified_names.last().map_or("", String::as_str),
                collision.qualified_names.join(", ")
            );
        }
    }
    Ok(())
}
