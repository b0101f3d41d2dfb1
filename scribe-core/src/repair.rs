//! The generate → verify → repair loop for one file.
//!
//! Driven as an explicit state machine: [`RepairRun::step`] performs one
//! transition. Each attempt rebuilds the prompt from the fixed per-file
//! request plus every earlier verification failure, oldest first. The loop
//! generates at most `max_attempts` times and always ends in
//! [`LoopState::Success`] or [`LoopState::Failed`].

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::artifact::TestArtifact;
use crate::error::{GenerationError, RepairError, ScribeError};
use crate::imports;
use crate::llm::{GenerationOptions, LlmProvider, TokenUsage, strip_code_fences};
use crate::prompt::{PromptRequest, build_prompt};
use crate::symbols::SymbolIndex;
use crate::verify::Verifier;

/// Everything the loop needs to know about the file under test.
#[derive(Debug, Clone)]
pub struct RepairJob<'a> {
    pub request: PromptRequest<'a>,
    /// Package of the class under test; empty for the default package.
    pub package: &'a str,
    pub destination: PathBuf,
    pub index: &'a SymbolIndex,
}

/// Record of one generation attempt.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationAttempt {
    /// 1-based, strictly increasing within one file.
    pub index: u32,
    pub started_at: DateTime<Utc>,
    pub prompt: String,
    pub raw_text: Option<String>,
    pub imports: Vec<String>,
    pub compiled: bool,
    pub failure_log: Option<String>,
    /// Set when the generation call itself failed.
    pub generation_error: Option<String>,
}

impl GenerationAttempt {
    fn new(index: u32, prompt: String) -> Self {
        Self {
            index,
            started_at: Utc::now(),
            prompt,
            raw_text: None,
            imports: Vec::new(),
            compiled: false,
            failure_log: None,
            generation_error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    Generating { attempt: u32 },
    Compiling { attempt: u32, artifact: TestArtifact },
    Retrying { attempt: u32 },
    Success(TestArtifact),
    Failed,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Failed)
    }
}

/// Bounded repair loop configuration shared by every file of a run.
#[derive(Debug)]
pub struct RepairLoop<'p> {
    provider: &'p dyn LlmProvider,
    verifier: &'p dyn Verifier,
    options: GenerationOptions,
    max_attempts: u32,
}

impl<'p> RepairLoop<'p> {
    pub fn new(
        provider: &'p dyn LlmProvider,
        verifier: &'p dyn Verifier,
        options: GenerationOptions,
        max_attempts: u32,
    ) -> Self {
        Self {
            provider,
            verifier,
            options,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Start a fresh run for one file. Nothing is shared between runs.
    pub fn start<'a>(&'a self, job: RepairJob<'a>) -> RepairRun<'a> {
        RepairRun {
            repair: self,
            job,
            state: LoopState::Generating { attempt: 1 },
            failures: Vec::new(),
            attempts: Vec::new(),
            usage: TokenUsage::default(),
        }
    }

    /// Drive a run to its terminal state.
    pub async fn run(&self, job: RepairJob<'_>) -> Result<RepairOutcome, ScribeError> {
        let mut run = self.start(job);
        while !run.state.is_terminal() {
            run.step().await?;
        }
        Ok(run.finish())
    }
}

/// In-flight state of one file's loop.
#[derive(Debug)]
pub struct RepairRun<'a> {
    repair: &'a RepairLoop<'a>,
    job: RepairJob<'a>,
    state: LoopState,
    failures: Vec<String>,
    attempts: Vec<GenerationAttempt>,
    usage: TokenUsage,
}

impl RepairRun<'_> {
    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn attempts(&self) -> &[GenerationAttempt] {
        &self.attempts
    }

    /// Verification logs collected so far, oldest first.
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Perform one transition. Terminal states are left unchanged.
    ///
    /// Only a verifier that cannot run at all is an error; generation
    /// failures and failed builds are recorded and counted.
    pub async fn step(&mut self) -> Result<(), ScribeError> {
        let next = match std::mem::replace(&mut self.state, LoopState::Failed) {
            LoopState::Generating { attempt } => self.generate(attempt).await?,
            LoopState::Compiling { attempt, artifact } => self.compile(attempt, artifact).await?,
            LoopState::Retrying { attempt } => LoopState::Generating {
                attempt: attempt + 1,
            },
            terminal @ (LoopState::Success(_) | LoopState::Failed) => terminal,
        };
        self.state = next;
        Ok(())
    }

    fn after_failure(&self, attempt: u32) -> LoopState {
        if attempt < self.repair.max_attempts {
            LoopState::Retrying { attempt }
        } else {
            LoopState::Failed
        }
    }

    async fn generate(&mut self, attempt: u32) -> Result<LoopState, ScribeError> {
        let request = &self.job.request;
        let prompt = build_prompt(request, &self.failures);
        info!(
            class = %request.class_name,
            attempt,
            max_attempts = self.repair.max_attempts,
            "Generating test"
        );

        let mut record = GenerationAttempt::new(attempt, prompt);
        let generated = self
            .repair
            .provider
            .generate(&record.prompt, &self.repair.options)
            .await
            .and_then(|(text, usage)| {
                self.usage.add(usage);
                let cleaned = strip_code_fences(&text);
                if cleaned.is_empty() {
                    Err(GenerationError::EmptyResponse)
                } else {
                    Ok(text)
                }
            });

        let text = match generated {
            Ok(text) => text,
            Err(e) => {
                warn!(class = %request.class_name, attempt, error = %e, "Generation failed");
                record.generation_error = Some(e.to_string());
                self.attempts.push(record);
                return Ok(self.after_failure(attempt));
            }
        };

        let resolved = imports::resolve(
            &text,
            self.job.package,
            request.class_name,
            self.job.index,
        )?;
        record.raw_text = Some(text);
        record.imports = resolved.lines();
        self.attempts.push(record);

        let artifact = TestArtifact::new(
            self.job.package,
            request.test_class,
            resolved,
            self.job.destination.clone(),
        );
        Ok(LoopState::Compiling { attempt, artifact })
    }

    async fn compile(
        &mut self,
        attempt: u32,
        artifact: TestArtifact,
    ) -> Result<LoopState, ScribeError> {
        let verification = self.repair.verifier.verify(&artifact).await?;
        let record = self.attempts.last_mut();

        if verification.success {
            if let Some(record) = record {
                record.compiled = true;
            }
            info!(test = %artifact.test_class, attempt, "Test verified");
            return Ok(LoopState::Success(artifact));
        }

        debug!(test = %artifact.test_class, attempt, log_len = verification.log.len(), "Verification failed");
        if let Some(record) = record {
            record.failure_log = Some(verification.log.clone());
        }
        self.failures.push(verification.log);
        Ok(self.after_failure(attempt))
    }

    fn finish(self) -> RepairOutcome {
        let result = match self.state {
            LoopState::Success(artifact) => Ok(artifact),
            _ => Err(RepairError::ExhaustedRetries {
                attempts: u32::try_from(self.attempts.len()).unwrap_or(u32::MAX),
                last_log: self.attempts.last().and_then(|a| a.failure_log.clone()),
            }),
        };
        RepairOutcome {
            result,
            attempts: self.attempts,
            usage: self.usage,
        }
    }
}

/// Terminal result of one file's loop plus its history.
#[derive(Debug)]
pub struct RepairOutcome {
    pub result: Result<TestArtifact, RepairError>,
    pub attempts: Vec<GenerationAttempt>,
    pub usage: TokenUsage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerifyError;
    use crate::strategy::classify;
    use crate::test_support::{
        FakeProvider, FakeVerifier, fail, pass, provider as fake_provider,
        verifier as fake_verifier,
    };

    const SOURCE: &str = "package com.acme.pay;\n\npublic class PaymentValidator {\n    private PaymentGateway gateway;\n\n    public Boolean isValid(String input) {\n        return gateway.accepts(input);\n    }\n}\n";

    async fn run_loop(
        provider: &FakeProvider,
        verifier: &FakeVerifier,
        max_attempts: u32,
    ) -> RepairOutcome {
        let facts = scribe_java::analyze(SOURCE).unwrap();
        let strategy = classify(&facts);
        let index = SymbolIndex::default();
        let repair = RepairLoop::new(provider, verifier, GenerationOptions::default(), max_attempts);
        repair
            .run(RepairJob {
                request: PromptRequest {
                    strategy: &strategy,
                    facts: &facts,
                    class_name: "PaymentValidator",
                    test_class: "PaymentValidatorTest",
                    source: SOURCE,
                },
                package: "com.acme.pay",
                destination: PathBuf::from("PaymentValidatorTest.java"),
                index: &index,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn failure_log_feeds_second_attempt() {
        let provider = fake_provider(Vec::new());
        let verifier = fake_verifier(vec![fail("cannot find symbol: Foo"), pass()]);

        let outcome = run_loop(&provider, &verifier, 5).await;
        let artifact = outcome.result.unwrap();
        assert_eq!(artifact.test_class, "PaymentValidatorTest");
        assert_eq!(outcome.attempts.len(), 2);
        assert_eq!(outcome.attempts[1].index, 2);
        assert!(outcome.attempts[1].compiled);

        let prompts = provider.seen();
        assert!(!prompts[0].contains("cannot find symbol: Foo"));
        let base_end = prompts[1].find("Do not include package or import lines.").unwrap();
        let log_pos = prompts[1].find("cannot find symbol: Foo").unwrap();
        assert!(base_end < log_pos);
        assert_eq!(outcome.usage.input_tokens, 200);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let provider = fake_provider(Vec::new());
        let verifier = fake_verifier(Vec::new());

        let outcome = run_loop(&provider, &verifier, 3).await;
        match outcome.result {
            Err(RepairError::ExhaustedRetries { attempts, last_log }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last_log.as_deref(), Some("still broken"));
            }
            Ok(_) => panic!("loop should have failed"),
        }
        assert_eq!(provider.seen().len(), 3);
        assert_eq!(verifier.seen().len(), 3);
        let indices: Vec<u32> = outcome.attempts.iter().map(|a| a.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn generation_failure_counts_without_feedback() {
        let provider = fake_provider(vec![
            Err(GenerationError::Network("connection reset".into())),
            Ok("```java\n```".into()),
        ]);
        let verifier = fake_verifier(vec![pass()]);

        let outcome = run_loop(&provider, &verifier, 5).await;
        assert!(outcome.result.is_ok());
        assert_eq!(outcome.attempts.len(), 3);
        assert!(outcome.attempts[0].generation_error.is_some());
        assert!(outcome.attempts[1].generation_error.is_some());
        assert_eq!(verifier.seen().len(), 1);
        assert!(!provider.seen()[2].contains("Fix compilation errors"));
    }

    #[tokio::test]
    async fn verifier_error_is_fatal() {
        let provider = fake_provider(Vec::new());
        let verifier = fake_verifier(vec![Err(VerifyError::Spawn("mvn: not found".into()))]);
        let facts = scribe_java::analyze(SOURCE).unwrap();
        let strategy = classify(&facts);
        let index = SymbolIndex::default();
        let repair = RepairLoop::new(&provider, &verifier, GenerationOptions::default(), 5);

        let err = repair
            .run(RepairJob {
                request: PromptRequest {
                    strategy: &strategy,
                    facts: &facts,
                    class_name: "PaymentValidator",
                    test_class: "PaymentValidatorTest",
                    source: SOURCE,
                },
                package: "com.acme.pay",
                destination: PathBuf::from("PaymentValidatorTest.java"),
                index: &index,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::Verify(VerifyError::Spawn(_))));
        assert_eq!(provider.seen().len(), 1);
    }

    #[tokio::test]
    async fn step_walks_the_states() {
        let provider = fake_provider(Vec::new());
        let verifier = fake_verifier(vec![fail("error: ';' expected"), pass()]);
        let facts = scribe_java::analyze(SOURCE).unwrap();
        let strategy = classify(&facts);
        let index = SymbolIndex::default();
        let repair = RepairLoop::new(&provider, &verifier, GenerationOptions::default(), 5);
        let mut run = repair.start(RepairJob {
            request: PromptRequest {
                strategy: &strategy,
                facts: &facts,
                class_name: "PaymentValidator",
                test_class: "PaymentValidatorTest",
                source: SOURCE,
            },
            package: "com.acme.pay",
            destination: PathBuf::from("PaymentValidatorTest.java"),
            index: &index,
        });

        assert_eq!(run.state(), &LoopState::Generating { attempt: 1 });
        run.step().await.unwrap();
        assert!(matches!(run.state(), LoopState::Compiling { attempt: 1, .. }));
        run.step().await.unwrap();
        assert_eq!(run.state(), &LoopState::Retrying { attempt: 1 });
        assert_eq!(run.failures(), ["error: ';' expected".to_string()]);
        run.step().await.unwrap();
        assert_eq!(run.state(), &LoopState::Generating { attempt: 2 });
        run.step().await.unwrap();
        run.step().await.unwrap();
        assert!(matches!(run.state(), LoopState::Success(_)));
        run.step().await.unwrap();
        assert!(run.state().is_terminal());
        assert_eq!(run.attempts().len(), 2);
    }
}
