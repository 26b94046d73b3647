//! [`BuildRunner`] implementations.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::traits::{BuildOutput, BuildRunner, HarvestError};

/// Runs `mvn dependency:list` and captures its output.
///
/// Stdout and stderr are read from the child's own pipes and merged in
/// arrival order.
#[derive(Debug, Clone)]
pub struct MavenRunner {
    command: String,
    args: Vec<String>,
}

impl MavenRunner {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: vec!["--batch-mode".to_string(), "dependency:list".to_string()],
        }
    }

    /// Replaces the default `--batch-mode dependency:list` arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for MavenRunner {
    fn default() -> Self {
        Self::new("mvn")
    }
}

#[async_trait]
impl BuildRunner for MavenRunner {
    fn tool_name(&self) -> &str {
        &self.command
    }

    #[instrument(skip(self), fields(tool = %self.command))]
    async fn run(&self, project_dir: &Path) -> Result<BuildOutput, HarvestError> {
        info!(args = ?self.args, dir = %project_dir.display(), "Invoking build tool");

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                HarvestError::BuildInvocation(format!("failed to launch '{}': {}", self.command, e))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HarvestError::BuildInvocation("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| HarvestError::BuildInvocation("stderr was not captured".to_string()))?;

        let mut out_lines = BufReader::new(stdout).split(b'\n');
        let mut err_lines = BufReader::new(stderr).split(b'\n');
        let mut lines = Vec::new();
        let mut out_done = false;
        let mut err_done = false;

        while !(out_done && err_done) {
            tokio::select! {
                line = out_lines.next_segment(), if !out_done => match line? {
                    Some(bytes) => {
                        let line = decode_line(&bytes);
                        debug!(target: "build", "{}", line);
                        lines.push(line);
                    }
                    None => out_done = true,
                },
                line = err_lines.next_segment(), if !err_done => match line? {
                    Some(bytes) => {
                        let line = decode_line(&bytes);
                        debug!(target: "build", "{}", line);
                        lines.push(line);
                    }
                    None => err_done = true,
                },
            }
        }

        let status = child.wait().await?;
        debug!(status = %status, lines = lines.len(), "Build tool exited");

        Ok(BuildOutput {
            lines,
            exit_code: status.code(),
        })
    }
}

/// Decodes one line of build output. Bytes that are not UTF-8 (paths in the
/// platform charset) are replaced rather than failing the run.
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Replays output that was captured elsewhere, e.g. by a CI job.
#[derive(Debug, Clone)]
pub struct LogFileRunner {
    path: PathBuf,
}

impl LogFileRunner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BuildRunner for LogFileRunner {
    fn tool_name(&self) -> &str {
        "log-file"
    }

    async fn run(&self, _project_dir: &Path) -> Result<BuildOutput, HarvestError> {
        let content = tokio::fs::read(&self.path).await.map_err(|e| {
            HarvestError::BuildInvocation(format!(
                "cannot read build log {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(BuildOutput {
            lines: String::from_utf8_lossy(&content)
                .lines()
                .map(str::to_string)
                .collect(),
            exit_code: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_both_streams_and_exit_code() {
        let dir = TempDir::new().unwrap();
        let runner = MavenRunner::new("sh").with_args([
            "-c",
            "echo '[INFO] Scanning for projects...'; echo '[ERROR] boom' 1>&2; exit 3",
        ]);

        let output = runner.run(dir.path()).await.unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert!(!output.succeeded());
        assert_eq!(output.lines.len(), 2);
        assert!(output.lines.contains(&"[INFO] Scanning for projects...".to_string()));
        assert!(output.lines.contains(&"[ERROR] boom".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_project_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();
        let runner = MavenRunner::new("sh").with_args(["-c", "ls"]);

        let output = runner.run(dir.path()).await.unwrap();
        assert_eq!(output.lines, vec!["pom.xml"]);
        assert!(output.succeeded());
    }

    #[tokio::test]
    async fn test_missing_executable_is_invocation_error() {
        let dir = TempDir::new().unwrap();
        let runner = MavenRunner::new("dmuncle-no-such-build-tool");

        let err = runner.run(dir.path()).await.unwrap_err();
        assert!(matches!(err, HarvestError::BuildInvocation(_)));
    }

    #[tokio::test]
    async fn test_log_file_runner_replays_lines() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("build.log");
        std::fs::write(&log, "[INFO] one\n[INFO] two\n").unwrap();

        let output = LogFileRunner::new(&log).run(dir.path()).await.unwrap();
        assert_eq!(output.lines, vec!["[INFO] one", "[INFO] two"]);
        assert_eq!(output.exit_code, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_output_is_decoded_lossily() {
        let dir = TempDir::new().unwrap();
        let runner = MavenRunner::new("sh").with_args([
            "-c",
            "printf '[INFO] --- maven-dependency-plugin:3.6.1:list (default-cli) @ core ---\\r\\n'; \
             printf '[INFO] The following files have been resolved:\\n'; \
             printf '[INFO]    org.slf4j:slf4j-api:jar:2.0.9:compile\\n'; \
             printf '[INFO]\\n'; \
             printf '[WARNING] caf\\351\\n'",
        ]);

        let output = runner.run(dir.path()).await.unwrap();

        assert!(output.succeeded());
        assert_eq!(output.lines.len(), 5);
        assert_eq!(
            output.lines[0],
            "[INFO] --- maven-dependency-plugin:3.6.1:list (default-cli) @ core ---"
        );
        assert_eq!(output.lines[4], "[WARNING] caf\u{FFFD}");
    }

    #[tokio::test]
    async fn test_log_file_runner_tolerates_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("build.log");
        let mut bytes = b"[INFO] one\r\n".to_vec();
        bytes.extend_from_slice(b"[WARNING] caf\xe9\n");
        std::fs::write(&log, bytes).unwrap();

        let output = LogFileRunner::new(&log).run(dir.path()).await.unwrap();
        assert_eq!(output.lines, vec!["[INFO] one", "[WARNING] caf\u{FFFD}"]);
    }

    #[tokio::test]
    async fn test_log_file_runner_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = LogFileRunner::new(dir.path().join("absent.log"))
            .run(dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::BuildInvocation(_)));
    }
}
