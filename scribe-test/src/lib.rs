// Integration test utilities and Java project fixtures for Scribe.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use scribe_core::artifact::TestArtifact;
use scribe_core::config::ScribeConfig;
use scribe_core::error::{GenerationError, VerifyError};
use scribe_core::llm::{GenerationOptions, LlmProvider, TokenUsage};
use scribe_core::pipeline::{RunReport, ScribePipeline};
use scribe_core::progress::NoopReporter;
use scribe_core::verify::{Verification, Verifier};

pub const MATH_SERVICE: &str = "package com.example.jagah.service;\n\nimport org.springframework.stereotype.Service;\n\n@Service\npublic class MathService {\n\n    public int add(int a, int b) {\n        return a + b;\n    }\n\n    public int multiply(int a, int b) {\n        return a * b;\n    }\n}\n";

pub const MATH_CONTROLLER: &str = "package com.example.jagah.controller;\n\nimport com.example.jagah.service.MathService;\n\n@RestController\n@RequestMapping(\"/api/math\")\npublic class MathController {\n\n    private final MathService mathService;\n\n    public MathController(MathService mathService) {\n        this.mathService = mathService;\n    }\n\n    @GetMapping(\"/add\")\n    public int add(@RequestParam int a, @RequestParam int b) {\n        return mathService.add(a, b);\n    }\n}\n";

pub const APPLICATION: &str = "package com.example.jagah;\n\nimport org.springframework.boot.SpringApplication;\nimport org.springframework.boot.autoconfigure.SpringBootApplication;\n\n@SpringBootApplication\npublic class JagahApplication {\n\n    public static void main(String[] args) {\n        SpringApplication.run(JagahApplication.class, args);\n    }\n}\n";

pub const PAYMENT_VALIDATOR: &str = "package com.example.jagah.pay;\n\npublic class PaymentValidator {\n\n    private PaymentGateway gateway;\n\n    public PaymentValidator(PaymentGateway gateway) {\n        this.gateway = gateway;\n    }\n\n    public Boolean isValid(String input) {\n        return input != null && gateway.accepts(input);\n    }\n}\n";

pub const PAYMENT_GATEWAY: &str = "package com.example.jagah.pay;\n\npublic interface PaymentGateway {\n    boolean accepts(String input);\n}\n";

pub const POINT: &str = "package com.example.jagah.model;\n\npublic class Point {\n\n    private int x;\n    private int y;\n\n    public int getX() {\n        return x;\n    }\n\n    public void setX(int x) {\n        this.x = x;\n    }\n\n    public int getY() {\n        return y;\n    }\n\n    public void setY(int y) {\n        this.y = y;\n    }\n}\n";

pub const USER_REPOSITORY: &str = "package com.example.jagah.repo;\n\nimport java.util.List;\n\npublic interface UserRepository extends JpaRepository<User, Long> {\n    List<User> findByName(String name);\n}\n";

/// A test fixture with a temporary Maven-layout Java project.
#[derive(Debug)]
pub struct TestProject {
    pub dir: tempfile::TempDir,
}

impl TestProject {
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        std::fs::create_dir_all(dir.path().join("src/main/java")).expect("create source root");
        Self { dir }
    }

    /// A small Spring Boot project: entry point, controller, service,
    /// a mock-worthy validator and its gateway, a POJO, and a repository.
    pub fn spring_app() -> Self {
        Self::empty()
            .with_source("com/example/jagah/JagahApplication.java", APPLICATION)
            .with_source("com/example/jagah/controller/MathController.java", MATH_CONTROLLER)
            .with_source("com/example/jagah/service/MathService.java", MATH_SERVICE)
            .with_source("com/example/jagah/pay/PaymentValidator.java", PAYMENT_VALIDATOR)
            .with_source("com/example/jagah/pay/PaymentGateway.java", PAYMENT_GATEWAY)
            .with_source("com/example/jagah/model/Point.java", POINT)
            .with_source("com/example/jagah/repo/UserRepository.java", USER_REPOSITORY)
    }

    #[must_use]
    pub fn with_source(self, rel: &str, text: &str) -> Self {
        let path = self.source_root().join(rel);
        std::fs::create_dir_all(path.parent().expect("source file has a parent"))
            .expect("create package dirs");
        std::fs::write(path, text).expect("write source file");
        self
    }

    #[must_use]
    pub fn with_config(self, toml: &str) -> Self {
        let path = ScribeConfig::path_for(self.path());
        std::fs::create_dir_all(path.parent().expect("config has a parent")).expect("create .scribe");
        std::fs::write(path, toml).expect("write config");
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_root(&self) -> PathBuf {
        self.path().join("src/main/java")
    }

    pub fn test_file(&self, rel: &str) -> PathBuf {
        self.path().join("src/test/java").join(rel)
    }

    pub fn pipeline(&self) -> ScribePipeline {
        let config = ScribeConfig::load(self.path()).expect("load config");
        ScribePipeline::new(self.path(), config).expect("open pipeline")
    }

    /// Run the full pipeline with scripted collaborators.
    pub async fn run(&self, provider: &ScriptedProvider, verifier: &ScriptedVerifier) -> RunReport {
        self.pipeline()
            .run(provider, verifier, &NoopReporter, None)
            .await
            .expect("run pipeline")
    }
}

/// Canned test class body for a given class under test.
pub fn passing_test_body(class_name: &str) -> String {
    format!(
        "```java\nclass {class_name}Test {{\n    @Test\n    void works() {{\n        assertTrue(true);\n    }}\n}}\n```"
    )
}

/// Generation collaborator that replays scripted replies and records every
/// prompt it is given. When the script runs out it answers with a plain
/// passing test class.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().expect("prompts lock").len()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }

    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<(String, TokenUsage), GenerationError> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.to_string());
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Ok(passing_test_body("Generated")));
        reply.map(|text| {
            let input_tokens = u64::try_from(prompt.len() / 4).unwrap_or(u64::MAX);
            (
                text,
                TokenUsage {
                    input_tokens,
                    output_tokens: 50,
                },
            )
        })
    }
}

/// Verification collaborator that replays scripted results and records
/// every artifact it is asked to verify. When the script runs out it
/// reports success.
#[derive(Debug, Default)]
pub struct ScriptedVerifier {
    results: Mutex<VecDeque<Result<Verification, VerifyError>>>,
    seen: Mutex<Vec<TestArtifact>>,
}

impl ScriptedVerifier {
    pub fn new(results: Vec<Result<Verification, VerifyError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            seen: Mutex::default(),
        }
    }

    /// Always fails with the same log.
    pub fn always_failing(log: &str, times: usize) -> Self {
        Self::new((0..times).map(|_| Self::fail(log)).collect())
    }

    pub fn pass() -> Result<Verification, VerifyError> {
        Ok(Verification {
            success: true,
            log: "BUILD SUCCESS".to_string(),
        })
    }

    pub fn fail(log: &str) -> Result<Verification, VerifyError> {
        Ok(Verification {
            success: false,
            log: log.to_string(),
        })
    }

    pub fn seen(&self) -> Vec<TestArtifact> {
        self.seen.lock().expect("seen lock").clone()
    }
}

#[async_trait::async_trait]
impl Verifier for ScriptedVerifier {
    async fn verify(&self, artifact: &TestArtifact) -> Result<Verification, VerifyError> {
        self.seen.lock().expect("seen lock").push(artifact.clone());
        self.results
            .lock()
            .expect("results lock")
            .pop_front()
            .unwrap_or_else(Self::pass)
    }
}
