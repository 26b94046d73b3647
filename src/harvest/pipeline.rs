//! Extraction pipeline executor.
//!
//! This module provides the [`ExtractionPipeline`] coordinator that takes a
//! project from build output to a persisted [`PackageDocument`]:
//! - Build invocation via a [`BuildRunner`], optionally bounded by a timeout
//! - Capture of the output into the buffer file, removed again via RAII
//!   (`Drop` on [`BufferFile`])
//! - Parsing, failure recording, normalization and merge on a blocking task
//! - Structured logging via `tracing`

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::HarvestConfig;
use crate::harvest::document::DocumentStore;
use crate::harvest::error_log::ErrorLog;
use crate::harvest::normalizer::{DependencyNormalizer, MergeSummary};
use crate::harvest::parser::{FailureSpan, OutputParser};
use crate::harvest::traits::{HarvestStage, ModuleBoundary};
use crate::model::PackageDocument;
use crate::traits::{BuildOutput, BuildRunner, HarvestError};

// ============================================================================
// Buffer File
// ============================================================================

/// Captured build output on disk.
///
/// # RAII Cleanup
///
/// `BufferFile` implements [`Drop`] so the file is removed once extraction
/// is done with it, including on error paths. It intentionally does **not**
/// implement `Clone`.
#[derive(Debug)]
pub struct BufferFile {
    path: PathBuf,
}

impl BufferFile {
    /// Writes `lines` to `path`, replacing whatever an earlier aborted run
    /// left behind.
    pub fn capture(path: impl Into<PathBuf>, lines: &[String]) -> Result<Self, HarvestError> {
        let path = path.into();
        let mut content = lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        fs::write(&path, content)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the buffer back as lines.
    pub fn read_lines(&self) -> Result<Vec<String>, HarvestError> {
        let content = fs::read_to_string(&self.path)?;
        Ok(content.lines().map(str::to_string).collect())
    }
}

impl Drop for BufferFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(
                    path = %self.path.display(),
                    "Failed to remove buffer file: {}",
                    e
                );
            }
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of one extraction run.
#[derive(Debug)]
pub struct ExtractionResult {
    /// Document as persisted at the end of the run
    pub document: PackageDocument,

    /// Failed modules and their error lines, in output order
    pub failures: Vec<FailureSpan>,

    pub stats: ExtractionStats,
}

/// Statistics about the extraction run.
#[derive(Debug, Default, Clone)]
pub struct ExtractionStats {
    /// Total time spent on the run (milliseconds)
    pub total_duration_ms: u64,

    /// Time spent waiting on the build tool (milliseconds)
    pub build_duration_ms: u64,

    /// Time spent parsing, normalizing and persisting (milliseconds)
    pub extraction_duration_ms: u64,

    /// Whether the build tool exited cleanly
    pub build_succeeded: bool,

    pub lines_scanned: usize,

    /// Dependency block lines found
    pub raw_entries: usize,

    /// Records appended to the document
    pub stored: usize,

    /// Entries skipped because they did not have six fields
    pub malformed: usize,

    /// Entries dropped because their scope is not tracked
    pub unrecognized_scope: usize,

    pub failed_modules: usize,
    pub diagnostic_lines: usize,
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Build output → persisted document.
///
/// 1. **Load**: read the existing document (fails fast if corrupt)
/// 2. **Build**: run the build tool, optionally with a timeout
/// 3. **Capture**: write the output to the buffer file
/// 4. **Extract**: parse, record failures, normalize, merge and persist
///
/// # Example
///
/// ```ignore
/// use dmuncle_harvester::harvest::pipeline::ExtractionPipeline;
/// use dmuncle_harvester::runner::MavenRunner;
///
/// let pipeline = ExtractionPipeline::from_config(MavenRunner::new("mvn"), &config);
/// let result = pipeline.execute(&config.project_dir).await?;
/// println!("Stored {} dependencies", result.stats.stored);
/// ```
pub struct ExtractionPipeline<R>
where
    R: BuildRunner,
{
    runner: R,
    parser: OutputParser,
    normalizer: DependencyNormalizer,
    store: DocumentStore,
    error_log: ErrorLog,
    buffer_path: PathBuf,

    /// Upper bound on the build stage (default: none)
    build_timeout: Option<Duration>,
}

impl<R> ExtractionPipeline<R>
where
    R: BuildRunner,
{
    pub fn new(
        runner: R,
        store: DocumentStore,
        error_log: ErrorLog,
        buffer_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            parser: OutputParser::default(),
            normalizer: DependencyNormalizer::new(),
            store,
            error_log,
            buffer_path: buffer_path.into(),
            build_timeout: None,
        }
    }

    /// Creates a pipeline using the file locations and settings in `config`.
    pub fn from_config(runner: R, config: &HarvestConfig) -> Self {
        Self::new(
            runner,
            DocumentStore::new(config.document_path()),
            ErrorLog::new(config.error_log_path()),
            config.buffer_path(),
        )
        .with_boundary(config.module_boundary)
        .with_timeout(config.build_timeout)
    }

    pub fn with_boundary(mut self, boundary: ModuleBoundary) -> Self {
        self.parser = OutputParser::new(boundary);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.build_timeout = timeout;
        self
    }

    /// Runs the whole extraction for the project rooted at `project_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError`] if:
    /// - the existing document is corrupt
    /// - the build tool cannot be launched or exceeds the timeout
    /// - the buffer or document cannot be written
    ///
    /// Malformed dependency lines and failed modules do not fail the run.
    pub async fn execute(&self, project_dir: &Path) -> Result<ExtractionResult, HarvestError> {
        let start = Instant::now();
        let mut stats = ExtractionStats::default();

        let document = self.store.load_or_default()?;
        info!(
            existing = document.len(),
            path = %self.store.path().display(),
            "Loaded package document"
        );

        // ====================================================================
        // Stage 1: Build
        // ====================================================================

        info!(tool = self.runner.tool_name(), "Starting build stage");
        let build_start = Instant::now();
        let output = self.run_build(project_dir).await?;
        stats.build_duration_ms = build_start.elapsed().as_millis() as u64;
        stats.build_succeeded = output.succeeded();

        if !stats.build_succeeded {
            warn!(
                exit_code = ?output.exit_code,
                "Build tool reported failure, extracting whatever was resolved"
            );
        }

        let buffer = BufferFile::capture(&self.buffer_path, &output.lines)?;
        info!(
            duration_ms = stats.build_duration_ms,
            lines = output.lines.len(),
            buffer = %buffer.path().display(),
            "Build completed"
        );

        // ====================================================================
        // Stage 2: Extraction
        // ====================================================================
        //
        // `buffer` moves into the blocking task and is dropped there, which
        // removes the file whether or not extraction succeeds.

        info!("Starting extraction stage");
        let extraction_start = Instant::now();

        let parser = self.parser;
        let normalizer = self.normalizer;
        let store = self.store.clone();
        let error_log = self.error_log.clone();

        let (document, failures, parsed_lines, raw_entries, summary) =
            tokio::task::spawn_blocking(move || {
                extract(buffer, parser, normalizer, &store, &error_log, document)
            })
            .await
            .map_err(|e| HarvestError::Io(std::io::Error::other(format!("Task join error: {}", e))))??;

        stats.extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;
        stats.lines_scanned = parsed_lines;
        stats.raw_entries = raw_entries;
        stats.stored = summary.stored;
        stats.malformed = summary.malformed;
        stats.unrecognized_scope = summary.unrecognized_scope;
        stats.failed_modules = failures.len();
        stats.diagnostic_lines = failures.iter().map(|f| f.lines.len()).sum();

        info!(
            duration_ms = stats.extraction_duration_ms,
            stored = stats.stored,
            malformed = stats.malformed,
            dropped = stats.unrecognized_scope,
            failed_modules = stats.failed_modules,
            "Extraction completed"
        );

        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        Ok(ExtractionResult {
            document,
            failures,
            stats,
        })
    }

    async fn run_build(&self, project_dir: &Path) -> Result<BuildOutput, HarvestError> {
        match self.build_timeout {
            Some(limit) => timeout(limit, self.runner.run(project_dir))
                .await
                .map_err(|_| HarvestError::StageTimeout {
                    stage: self.runner.tool_name().to_string(),
                    timeout_secs: limit.as_secs(),
                })?,
            None => self.runner.run(project_dir).await,
        }
    }
}

type Extracted = (PackageDocument, Vec<FailureSpan>, usize, usize, MergeSummary);

fn extract(
    buffer: BufferFile,
    parser: OutputParser,
    normalizer: DependencyNormalizer,
    store: &DocumentStore,
    error_log: &ErrorLog,
    mut document: PackageDocument,
) -> Result<Extracted, HarvestError> {
    let lines = buffer.read_lines()?;
    let parsed = parser.execute(lines).unwrap_or_else(|never| match never {});
    debug!(
        stage = parser.stage_name(),
        lines = parsed.lines_scanned,
        entries = parsed.dependencies.len(),
        diagnostics = parsed.diagnostics.len(),
        "Parsed build output"
    );

    let failures = parsed.failure_spans();
    if let Err(e) = error_log.record(&failures) {
        warn!(
            log = %error_log.path().display(),
            "Could not write error log: {}",
            e
        );
    }

    let summary = normalizer.merge_into(&parsed.dependencies, &mut document)?;
    store.persist(&document)?;

    Ok((
        document,
        failures,
        parsed.lines_scanned,
        parsed.dependencies.len(),
        summary,
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{LogFileRunner, MavenRunner};
    use async_trait::async_trait;
    use tempfile::TempDir;

    // Replays a fixed output
    struct FakeRunner {
        lines: Vec<String>,
        exit_code: Option<i32>,
    }

    impl FakeRunner {
        fn new(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|l| l.to_string()).collect(),
                exit_code: Some(0),
            }
        }
    }

    #[async_trait]
    impl BuildRunner for FakeRunner {
        fn tool_name(&self) -> &str {
            "fake"
        }

        async fn run(&self, _project_dir: &Path) -> Result<BuildOutput, HarvestError> {
            Ok(BuildOutput {
                lines: self.lines.clone(),
                exit_code: self.exit_code,
            })
        }
    }

    // Never finishes
    struct StuckRunner;

    #[async_trait]
    impl BuildRunner for StuckRunner {
        fn tool_name(&self) -> &str {
            "stuck"
        }

        async fn run(&self, _project_dir: &Path) -> Result<BuildOutput, HarvestError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(BuildOutput::default())
        }
    }

    fn pipeline<R: BuildRunner>(runner: R, dir: &TempDir) -> ExtractionPipeline<R> {
        ExtractionPipeline::new(
            runner,
            DocumentStore::new(dir.path().join("dmuncle-package.json")),
            ErrorLog::new(dir.path().join("dmuncle-errors-log.txt")),
            dir.path().join("dmuncle-buffer-file.txt"),
        )
    }

    const SINGLE_DEPENDENCY: &[&str] = &[
        "[INFO] --- maven-dependency-plugin:2.8:list (default-cli) @ core ---",
        "[INFO] The following files have been resolved:",
        "[INFO]    g:a:jar:1.0:compile",
        "[INFO] ",
        "[INFO] BUILD SUCCESS",
    ];

    #[tokio::test]
    async fn test_pipeline_execution() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(FakeRunner::new(SINGLE_DEPENDENCY), &dir);

        let result = pipeline.execute(dir.path()).await.unwrap();

        assert_eq!(result.document.compile_artifacts.len(), 1);
        assert_eq!(result.document.compile_artifacts[0].module_name, "core");
        assert_eq!(result.stats.lines_scanned, 5);
        assert_eq!(result.stats.raw_entries, 1);
        assert_eq!(result.stats.stored, 1);
        assert!(result.stats.build_succeeded);
        assert!(result.failures.is_empty());

        // Buffer consumed and removed, document persisted, no error log
        assert!(!dir.path().join("dmuncle-buffer-file.txt").exists());
        assert!(dir.path().join("dmuncle-package.json").exists());
        assert!(!dir.path().join("dmuncle-errors-log.txt").exists());
    }

    #[tokio::test]
    async fn test_repeated_runs_accumulate_duplicates() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(FakeRunner::new(SINGLE_DEPENDENCY), &dir);

        pipeline.execute(dir.path()).await.unwrap();
        let second = pipeline.execute(dir.path()).await.unwrap();

        assert_eq!(second.document.compile_artifacts.len(), 2);
        let stored = DocumentStore::new(dir.path().join("dmuncle-package.json"))
            .load()
            .unwrap();
        assert_eq!(stored.compile_artifacts.len(), 2);
        assert_eq!(stored.compile_artifacts[0], stored.compile_artifacts[1]);
    }

    #[tokio::test]
    async fn test_failed_build_still_extracts_and_logs() {
        let dir = TempDir::new().unwrap();
        let mut runner = FakeRunner::new(&[
            "[INFO] --- maven-dependency-plugin:2.8:list (default-cli) @ core ---",
            "[INFO] The following files have been resolved:",
            "[INFO]    g:a:jar:1.0:runtime",
            "[INFO] ",
            "[INFO] --- maven-dependency-plugin:2.8:list (default-cli) @ web ---",
            "[INFO] BUILD FAILURE",
            "[ERROR] Failed to execute goal on project web",
            "[ERROR] Could not resolve dependencies for project shop:web:war:1.0",
        ]);
        runner.exit_code = Some(1);

        let result = pipeline(runner, &dir).execute(dir.path()).await.unwrap();

        assert!(!result.stats.build_succeeded);
        assert_eq!(result.document.runtime_artifacts.len(), 1);
        assert_eq!(result.stats.failed_modules, 1);
        assert_eq!(result.stats.diagnostic_lines, 2);

        let log = fs::read_to_string(dir.path().join("dmuncle-errors-log.txt")).unwrap();
        assert_eq!(
            log,
            "web\n\
             [ERROR] Failed to execute goal on project web\n\
             [ERROR] Could not resolve dependencies for project shop:web:war:1.0\n"
        );
    }

    #[tokio::test]
    async fn test_corrupt_document_aborts_before_build() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("dmuncle-package.json"), "[]").unwrap();

        let err = pipeline(FakeRunner::new(SINGLE_DEPENDENCY), &dir)
            .execute(dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::CorruptDocument { .. }));
        assert!(!dir.path().join("dmuncle-buffer-file.txt").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("dmuncle-package.json")).unwrap(),
            "[]"
        );
    }

    #[tokio::test]
    async fn test_build_timeout() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(StuckRunner, &dir).with_timeout(Some(Duration::from_millis(50)));

        let err = pipeline.execute(dir.path()).await.unwrap_err();
        assert!(matches!(err, HarvestError::StageTimeout { ref stage, .. } if stage == "stuck"));
    }

    #[tokio::test]
    async fn test_building_banner_boundary() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(
            FakeRunner::new(&[
                "[INFO] Building core 1.0-SNAPSHOT",
                "[INFO] The following files have been resolved:",
                "[INFO]    g:a:jar:1.0:system",
                "[INFO] ",
            ]),
            &dir,
        )
        .with_boundary(ModuleBoundary::BuildingBanner);

        let result = pipeline.execute(dir.path()).await.unwrap();
        assert_eq!(
            result.document.test_runtime_artifacts[0].module_name,
            "core 1.0-SNAPSHOT"
        );
    }

    #[tokio::test]
    async fn test_replayed_log_with_invalid_utf8_is_harvested() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("build.log");
        let mut bytes = SINGLE_DEPENDENCY.join("\n").into_bytes();
        bytes.extend_from_slice(b"\n[WARNING] Path /home/jos\xe9/.m2 is not writable\n");
        fs::write(&log, bytes).unwrap();

        let result = pipeline(LogFileRunner::new(&log), &dir)
            .execute(dir.path())
            .await
            .unwrap();

        assert_eq!(result.stats.lines_scanned, 6);
        assert_eq!(result.stats.stored, 1);
        let stored = DocumentStore::new(dir.path().join("dmuncle-package.json"))
            .load()
            .unwrap();
        assert_eq!(stored.compile_artifacts[0].artifact_id, "a");
        assert_eq!(stored.compile_artifacts[0].module_name, "core");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_output_with_invalid_utf8_is_harvested() {
        let dir = TempDir::new().unwrap();
        let runner = MavenRunner::new("sh").with_args([
            "-c",
            "printf '[INFO] --- maven-dependency-plugin:2.8:list (default-cli) @ core ---\\n'; \
             printf '[INFO] The following files have been resolved:\\n'; \
             printf '[INFO]    g:a:jar:1.0:compile\\n'; \
             printf '[INFO] \\n'; \
             printf '[WARNING] caf\\351\\n'",
        ]);

        let result = pipeline(runner, &dir).execute(dir.path()).await.unwrap();

        assert!(result.stats.build_succeeded);
        assert_eq!(result.stats.stored, 1);
        let stored = DocumentStore::new(dir.path().join("dmuncle-package.json"))
            .load()
            .unwrap();
        assert_eq!(stored.compile_artifacts[0].module_name, "core");
        assert_eq!(stored.compile_artifacts[0].artifact_id, "a");
    }

    #[test]
    fn test_buffer_file_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("buffer.txt");
        fs::write(&path, "stale content from an aborted run\nmore\nlines\n").unwrap();

        {
            let buffer = BufferFile::capture(&path, &["one".to_string(), "two".to_string()]).unwrap();
            assert_eq!(buffer.read_lines().unwrap(), vec!["one", "two"]);
        }
        assert!(!path.exists());
    }
}
