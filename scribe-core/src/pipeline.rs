// Run orchestrator: Index → Analyze → Classify → Generate/Verify/Repair,
// one file at a time, with per-file error isolation.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use scribe_java::{SourceFacts, Stereotype};

use crate::artifact::destination;
use crate::config::ScribeConfig;
use crate::discover::{discover_sources, display_relative};
use crate::error::{ConfigError, ScribeError};
use crate::llm::{LlmProvider, TokenUsage};
use crate::progress::ProgressReporter;
use crate::prompt::PromptRequest;
use crate::repair::{RepairJob, RepairLoop};
use crate::strategy::{TestStrategy, classify};
use crate::symbols::{Collision, SymbolIndex};
use crate::verify::Verifier;

/// Where a file's processing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Read,
    Analyze,
    Generate,
    Verify,
    Write,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Analyze => "analyze",
            Self::Generate => "generate",
            Self::Verify => "verify",
            Self::Write => "write",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Generated { test_path: PathBuf },
    Skipped { reason: String },
    Failed { stage: Stage, error: String },
}

/// Result of processing one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    /// Path relative to the source root.
    pub file: String,
    pub class_name: String,
    /// Strategy label, once classification ran.
    pub strategy: Option<String>,
    pub attempts: u32,
    #[serde(flatten)]
    pub status: FileStatus,
}

/// Summary of a full generation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub provider: String,
    pub model: String,
    pub usage: TokenUsage,
    pub files: Vec<FileOutcome>,
}

impl RunReport {
    fn count(&self, pred: impl Fn(&FileStatus) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.status)).count()
    }

    pub fn generated(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Generated { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed { .. }))
    }

    /// Some files failed; the rest of the run completed.
    pub fn is_partial(&self) -> bool {
        self.failed() > 0
    }
}

/// One file's analysis and strategy, without generation.
#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub file: String,
    pub class_name: String,
    pub stereotype: Stereotype,
    pub strategy: TestStrategy,
    pub test_path: Option<PathBuf>,
    pub methods: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub symbols: usize,
    pub collisions: Vec<Collision>,
    pub files: Vec<PlanEntry>,
}

/// Drives a run over one Java project.
#[derive(Debug)]
pub struct ScribePipeline {
    project_root: PathBuf,
    config: ScribeConfig,
}

impl ScribePipeline {
    /// Fails if the project root or its source root does not exist.
    pub fn new(project_root: &Path, config: ScribeConfig) -> crate::error::Result<Self> {
        if !project_root.is_dir() {
            return Err(ConfigError::NotFound(format!(
                "project root {}",
                project_root.display()
            ))
            .into());
        }
        let pipeline = Self {
            project_root: project_root.to_path_buf(),
            config,
        };
        let source_root = pipeline.source_root();
        if !source_root.is_dir() {
            return Err(ConfigError::NotFound(format!(
                "source root {}",
                source_root.display()
            ))
            .into());
        }
        Ok(pipeline)
    }

    pub fn config(&self) -> &ScribeConfig {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn source_root(&self) -> PathBuf {
        self.project_root.join(&self.config.project.source_root)
    }

    pub fn test_root(&self) -> PathBuf {
        self.project_root.join(&self.config.project.test_root)
    }

    /// Build the symbol index. Run-scoped: a collision under the `error`
    /// policy stops the run.
    pub fn build_index(&self) -> crate::error::Result<SymbolIndex> {
        Ok(SymbolIndex::build(
            &self.source_root(),
            &self.config.project,
            self.config.symbols.collision,
        )?)
    }

    /// Source files in scan order, optionally narrowed by a glob over the
    /// path relative to the source root.
    pub fn discover(&self, only: Option<&glob::Pattern>) -> Vec<PathBuf> {
        let source_root = self.source_root();
        let mut files = discover_sources(
            &source_root,
            &self.config.project.include_patterns,
            &self.config.project.exclude_patterns,
        );
        if let Some(pattern) = only {
            files.retain(|f| pattern.matches(&display_relative(f, &source_root)));
        }
        files
    }

    /// Analyze and classify every file without generating anything.
    #[instrument(skip_all, name = "plan")]
    pub fn plan(&self, only: Option<&glob::Pattern>) -> crate::error::Result<PlanReport> {
        let index = self.build_index()?;
        let source_root = self.source_root();
        let mut entries = Vec::new();

        for file in self.discover(only) {
            let rel = display_relative(&file, &source_root);
            let class_name = class_name_for(&file);
            let facts = match std::fs::read_to_string(&file)
                .map_err(ScribeError::from)
                .and_then(|text| scribe_java::analyze(&text).map_err(ScribeError::from))
            {
                Ok(facts) => facts,
                Err(e) => {
                    warn!(path = %rel, error = %e, "Cannot analyze file");
                    SourceFacts {
                        warnings: vec![e.to_string()],
                        ..SourceFacts::default()
                    }
                }
            };
            let strategy = classify(&facts);
            let test_class = format!("{class_name}{}", self.config.project.test_suffix);
            let test_path = (!strategy.is_skip())
                .then(|| destination(&self.test_root(), &facts.package, &test_class));
            entries.push(PlanEntry {
                file: rel,
                class_name,
                stereotype: facts.stereotype,
                strategy,
                test_path,
                methods: facts.methods.len(),
                warnings: facts.warnings,
            });
        }

        Ok(PlanReport {
            symbols: index.len(),
            collisions: index.collisions().to_vec(),
            files: entries,
        })
    }

    /// Process every discovered file. Per-file failures are recorded in the
    /// report; only run-scoped errors return `Err`.
    #[instrument(skip_all, name = "generate", fields(root = %self.project_root.display()))]
    pub async fn run(
        &self,
        provider: &dyn LlmProvider,
        verifier: &dyn Verifier,
        progress: &dyn ProgressReporter,
        only: Option<&glob::Pattern>,
    ) -> crate::error::Result<RunReport> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let run_id = Uuid::new_v4();

        let index = self.build_index()?;
        let files = self.discover(only);
        info!(%run_id, files = files.len(), symbols = index.len(), "Starting generation run");

        let repair = RepairLoop::new(
            provider,
            verifier,
            self.config.llm.generation_options(),
            self.config.repair.max_attempts,
        );

        let mut report = RunReport {
            run_id,
            started_at,
            duration_ms: 0,
            provider: provider.name().to_string(),
            model: provider.model_id().to_string(),
            usage: TokenUsage::default(),
            files: Vec::with_capacity(files.len()),
        };

        progress.start("generate", Some(files.len() as u64));
        for file in &files {
            let rel = display_relative(file, &self.source_root());
            progress.working_on(&rel);
            let outcome = self.process_file(&repair, &index, file, rel, &mut report.usage).await;
            if let FileStatus::Failed { stage, error } = &outcome.status {
                progress.message(&format!("failed {} ({stage}): {error}", outcome.file));
            }
            report.files.push(outcome);
            progress.advance(1);
        }
        progress.finish();

        report.duration_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            generated = report.generated(),
            skipped = report.skipped(),
            failed = report.failed(),
            duration_ms = report.duration_ms,
            "Generation run finished"
        );
        Ok(report)
    }

    async fn process_file(
        &self,
        repair: &RepairLoop<'_>,
        index: &SymbolIndex,
        file: &Path,
        rel: String,
        usage: &mut TokenUsage,
    ) -> FileOutcome {
        let class_name = class_name_for(file);
        let mut outcome = FileOutcome {
            file: rel,
            class_name: class_name.clone(),
            strategy: None,
            attempts: 0,
            status: FileStatus::Skipped {
                reason: String::new(),
            },
        };

        let source = match std::fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %outcome.file, error = %e, "Cannot read source file");
                outcome.status = failed(Stage::Read, &e);
                return outcome;
            }
        };

        let facts = match scribe_java::analyze(&source) {
            Ok(facts) => facts,
            Err(e) => {
                warn!(path = %outcome.file, error = %e, "Cannot analyze source file");
                outcome.status = failed(Stage::Analyze, &e);
                return outcome;
            }
        };
        for warning in &facts.warnings {
            warn!(path = %outcome.file, warning = %warning, "Partial analysis");
        }
        if let Some(declared) = &facts.class_name {
            if *declared != class_name {
                warn!(path = %outcome.file, declared = %declared, "Declared type differs from file name");
            }
        }

        let strategy = classify(&facts);
        outcome.strategy = Some(strategy.label().to_string());
        if let TestStrategy::Skip(reason) = &strategy {
            debug!(path = %outcome.file, %reason, "Skipping");
            outcome.status = FileStatus::Skipped {
                reason: reason.to_string(),
            };
            return outcome;
        }

        let test_class = format!("{class_name}{}", self.config.project.test_suffix);
        let job = RepairJob {
            request: PromptRequest {
                strategy: &strategy,
                facts: &facts,
                class_name: &class_name,
                test_class: &test_class,
                source: &source,
            },
            package: &facts.package,
            destination: destination(&self.test_root(), &facts.package, &test_class),
            index,
        };

        let repaired = match repair.run(job).await {
            Ok(repaired) => repaired,
            Err(e) => {
                warn!(path = %outcome.file, error = %e, "Verification could not run");
                outcome.status = failed(Stage::Verify, &e);
                return outcome;
            }
        };
        usage.add(repaired.usage);
        outcome.attempts = u32::try_from(repaired.attempts.len()).unwrap_or(u32::MAX);

        let artifact = match repaired.result {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(path = %outcome.file, error = %e, "Giving up on file");
                outcome.status = failed(Stage::Generate, &e);
                return outcome;
            }
        };

        if let Err(e) = artifact.write() {
            warn!(path = %artifact.path.display(), error = %e, "Cannot write test file");
            outcome.status = failed(Stage::Write, &e);
            return outcome;
        }
        info!(path = %outcome.file, test = %artifact.path.display(), attempts = outcome.attempts, "Test written");
        outcome.status = FileStatus::Generated {
            test_path: artifact.path,
        };
        outcome
    }
}

fn failed(stage: Stage, error: &dyn std::fmt::Display) -> FileStatus {
    FileStatus::Failed {
        stage,
        error: error.to_string(),
    }
}

/// The class under test is named after its file.
fn class_name_for(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
