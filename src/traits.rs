use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    /// A raw dependency entry did not split into six non-empty fields.
    #[error("Malformed dependency line: '{line}'")]
    MalformedDependencyLine { line: String },

    /// The persisted document exists but cannot be used.
    #[error("Corrupt package document {}: {reason}", .path.display())]
    CorruptDocument { path: PathBuf, reason: String },

    #[error("No package document at {}", .0.display())]
    MissingDocument(PathBuf),

    /// The build tool could not be launched or its output could not be read.
    #[error("Build invocation failed: {0}")]
    BuildInvocation(String),

    #[error("Transmission to {url} failed: {reason}")]
    TransmissionFailure {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("Stage '{stage}' timed out after {timeout_secs}s")]
    StageTimeout { stage: String, timeout_secs: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarvestError {
    /// Whether the error must end the run. Malformed lines are skipped by the
    /// extraction stage; everything else stops it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, HarvestError::MalformedDependencyLine { .. })
    }
}

/// Everything a build tool printed during one invocation.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Stdout and stderr lines in arrival order.
    pub lines: Vec<String>,
    /// `None` when the exit status is unknown (replayed logs, signals).
    pub exit_code: Option<i32>,
}

impl BuildOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code.map_or(true, |code| code == 0)
    }
}

#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Returns the build tool this runner drives (e.g., "mvn").
    fn tool_name(&self) -> &str;

    /// Runs the dependency listing for the project rooted at `project_dir`.
    ///
    /// A build that runs but fails is not an error; its failure shows up in
    /// the returned lines and exit code.
    async fn run(&self, project_dir: &Path) -> Result<BuildOutput, HarvestError>;
}

#[async_trait]
pub trait Transmitter: Send + Sync {
    /// Delivers a serialized document to `url`. Any non-success answer is an
    /// error; no retry is attempted.
    async fn transmit(&self, url: &str, body: Vec<u8>) -> Result<(), HarvestError>;
}
