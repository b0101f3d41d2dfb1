// Scripted collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::artifact::TestArtifact;
use crate::error::{GenerationError, VerifyError};
use crate::llm::{GenerationOptions, LlmProvider, TokenUsage};
use crate::verify::{Verification, Verifier};

pub const GOOD_TEST: &str =
    "class PaymentValidatorTest {\n    @Test\n    void accepts() { assertTrue(true); }\n}";

/// Answers in order, then `fallback` forever. Every request is recorded.
#[derive(Debug)]
pub struct Script<T> {
    answers: Mutex<VecDeque<T>>,
    fallback: fn() -> T,
    seen: Mutex<Vec<String>>,
}

impl<T> Script<T> {
    fn new(answers: Vec<T>, fallback: fn() -> T) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            fallback,
            seen: Mutex::default(),
        }
    }

    fn next(&self, request: String) -> T {
        self.seen.lock().unwrap().push(request);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(self.fallback)
    }

    /// Prompts for a provider, test class names for a verifier.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

pub type FakeProvider = Script<Result<String, GenerationError>>;
pub type FakeVerifier = Script<Result<Verification, VerifyError>>;

/// Replays `replies`, then answers with [`GOOD_TEST`].
pub fn provider(replies: Vec<Result<String, GenerationError>>) -> FakeProvider {
    Script::new(replies, || Ok(GOOD_TEST.to_string()))
}

/// Replays `results`, then fails with "still broken".
pub fn verifier(results: Vec<Result<Verification, VerifyError>>) -> FakeVerifier {
    Script::new(results, || fail("still broken"))
}

pub fn passing_verifier() -> FakeVerifier {
    Script::new(Vec::new(), pass)
}

#[async_trait::async_trait]
impl LlmProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn model_id(&self) -> &str {
        "fake-model"
    }

    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<(String, TokenUsage), GenerationError> {
        let usage = TokenUsage {
            input_tokens: 100,
            output_tokens: 10,
        };
        self.next(prompt.to_string()).map(|text| (text, usage))
    }
}

#[async_trait::async_trait]
impl Verifier for FakeVerifier {
    async fn verify(&self, artifact: &TestArtifact) -> Result<Verification, VerifyError> {
        self.next(artifact.test_class.clone())
    }
}

pub fn fail(log: &str) -> Result<Verification, VerifyError> {
    Ok(Verification {
        success: false,
        log: log.into(),
    })
}

pub fn pass() -> Result<Verification, VerifyError> {
    Ok(Verification {
        success: true,
        log: String::new(),
    })
}
