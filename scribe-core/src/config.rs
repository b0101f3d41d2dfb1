use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ScribeError};

/// Directory under the project root holding Scribe's files.
pub const SCRIBE_DIR: &str = ".scribe";

/// Top-level Scribe configuration, matching `.scribe/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScribeConfig {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub repair: RepairSection,
    #[serde(default)]
    pub verify: VerifySection,
    #[serde(default)]
    pub symbols: SymbolsSection,
}

impl ScribeConfig {
    /// Path of the config file for a project root.
    pub fn path_for(project_root: &Path) -> PathBuf {
        project_root.join(SCRIBE_DIR).join("config.toml")
    }

    /// Load `.scribe/config.toml` from the project root, falling back to
    /// defaults when the file does not exist. The result is validated.
    pub fn load(project_root: &Path) -> crate::error::Result<Self> {
        let path = Self::path_for(project_root);
        let config = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            Self::from_toml(&text)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ScribeError> {
        if self.repair.max_attempts == 0 {
            return Err(ConfigError::Invalid("repair.max_attempts must be at least 1".into()).into());
        }
        if self.verify.command.is_empty() {
            return Err(ConfigError::Invalid("verify.command must not be empty".into()).into());
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            ))
            .into());
        }
        if self.project.include_patterns.is_empty() {
            return Err(
                ConfigError::Invalid("project.include_patterns must not be empty".into()).into(),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    /// Root of the production sources, relative to the project root.
    pub source_root: PathBuf,
    /// Root under which generated tests are written.
    pub test_root: PathBuf,
    /// Appended to the class name to form the test class name.
    pub test_suffix: String,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("src/main/java"),
            test_root: PathBuf::from("src/test/java"),
            test_suffix: "Test".to_string(),
            include_patterns: vec!["**/*.java".into()],
            exclude_patterns: vec![
                "**/package-info.java".into(),
                "**/module-info.java".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// `groq`, `openai`, `anthropic`, or `custom` (OpenAI-compatible).
    pub provider: String,
    pub model: String,
    /// Environment variable holding the API key. There is no fallback key.
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            base_url: None,
            temperature: 0.1,
            max_output_tokens: 4096,
            timeout_secs: 120,
        }
    }
}

impl LlmSection {
    /// Read the API key from the process environment. Fails closed.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Resolve the API key through an arbitrary lookup (the environment in
    /// production). Empty or whitespace-only values count as missing.
    pub fn resolve_api_key_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        lookup(&self.api_key_env)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::CredentialMissing {
                env_var: self.api_key_env.clone(),
            })
    }

    pub fn generation_options(&self) -> crate::llm::GenerationOptions {
        crate::llm::GenerationOptions {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairSection {
    pub max_attempts: u32,
}

impl Default for RepairSection {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifySection {
    /// Build command argv; `{test}` is replaced with the test class name.
    pub command: Vec<String>,
    /// When set, the combined output must also contain this text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_marker: Option<String>,
    pub timeout_secs: u64,
}

impl Default for VerifySection {
    fn default() -> Self {
        Self {
            command: vec![
                "mvn".into(),
                "-q".into(),
                "-Dtest={test}".into(),
                "test".into(),
            ],
            success_marker: None,
            timeout_secs: 600,
        }
    }
}

/// What to do when two files declare the same simple type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// Keep the file scanned last (lexicographic path order); log the collision.
    #[default]
    LastWins,
    /// Refuse to build the index.
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolsSection {
    pub collision: CollisionPolicy,
}
