/// Top-level Scribe error type.
///
/// All fallible operations in `scribe-core` return [`Result<T, ScribeError>`](Result).
/// Each variant wraps a domain-specific error enum so callers can tell a
/// run-scoped failure (configuration, credentials) from a file-scoped one
/// (generation, verification, exhausted retries).
#[derive(thiserror::Error, Debug)]
pub enum ScribeError {
    /// Error in configuration parsing, validation, or credential lookup.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The Java syntax layer could not parse a file.
    #[error("Syntax error: {0}")]
    Syntax(#[from] scribe_java::SyntaxError),

    /// The text-generation collaborator failed.
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// The verification collaborator could not be run.
    #[error("Verification error: {0}")]
    Verify(#[from] VerifyError),

    /// The verify/repair loop gave up on a file.
    #[error("Repair error: {0}")]
    Repair(#[from] RepairError),

    /// Filesystem I/O error reading sources or writing artifacts.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScribeError {
    /// Run-scoped errors stop the whole run before any file is processed.
    pub fn is_run_scoped(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Errors in Scribe configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A required path does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),

    /// No credential for the generation provider in the environment.
    #[error("Missing API credential: set the {env_var} environment variable")]
    CredentialMissing {
        /// Name of the environment variable that was consulted.
        env_var: String,
    },
}

/// Errors from the text-generation collaborator.
#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    /// Network-level failure connecting to the provider.
    #[error("Network error: {0}")]
    Network(String),

    /// Provider API returned a non-success HTTP status.
    #[error("API error (HTTP {status}): {body}")]
    ApiError {
        /// HTTP status code from the provider.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Provider response could not be parsed into the expected format.
    #[error("Response parse error: {0}")]
    Parse(String),

    /// Provider configuration is invalid (unknown provider, bad client setup).
    #[error("Provider configuration error: {0}")]
    Config(String),

    /// The provider answered, but with nothing usable as test code.
    #[error("Empty or unusable response")]
    EmptyResponse,
}

/// Errors from the verification collaborator itself (not a failed build).
#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    /// The build command could not be started.
    #[error("Failed to run build command: {0}")]
    Spawn(String),

    /// Staging or restoring the candidate file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal failures of the verify/repair loop.
#[derive(thiserror::Error, Debug)]
pub enum RepairError {
    /// Every attempt failed verification or generation.
    #[error("No compilable test after {attempts} attempts")]
    ExhaustedRetries {
        /// Number of attempts made.
        attempts: u32,
        /// Failure log of the final attempt, if verification ran.
        last_log: Option<String>,
    },
}

/// Convenience alias for `Result<T, ScribeError>`.
pub type Result<T> = std::result::Result<T, ScribeError>;
