use clap::Parser;

use scribe_core::error::{ConfigError, ScribeError};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "scribe",
    version,
    about = "Generate compiling JUnit 5 tests for Java projects with an LLM"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Classify an error into a process exit code.
///
/// Exit codes:
///   0  success
///   1  general/unknown error
///   2  configuration or credential error
///   3  project root not found
///   10 partial success (some files failed)
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<commands::PartialSuccess>().is_some() {
        return 10;
    }

    for cause in err.chain() {
        if let Some(scribe) = cause.downcast_ref::<ScribeError>() {
            return match scribe {
                ScribeError::Config(ConfigError::NotFound(_)) => 3,
                ScribeError::Config(_) => 2,
                _ => 1,
            };
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return 2;
        }
    }

    let lower = format!("{err:#}").to_lowercase();
    if lower.contains("cannot resolve path") {
        3
    } else if lower.contains("config") {
        2
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create runtime: {e}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(commands::run(cli.command, cli.quiet)) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}
