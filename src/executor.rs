use tracing::{error, info, instrument};

use crate::config::HarvestConfig;
use crate::harvest::document::{remove_if_present, DocumentStore};
use crate::harvest::error_log::ErrorLog;
use crate::harvest::pipeline::{ExtractionPipeline, ExtractionResult};
use crate::traits::{BuildRunner, HarvestError, Transmitter};

/// What a successful send delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub url: String,
    pub project_name: String,
    pub entries: usize,
    /// Whether an error log existed when the document was sent
    pub had_errors: bool,
}

/// Entry point for the two runs: `watch` (extract) and `send` (transmit).
pub struct HarvesterExecutor {
    config: HarvestConfig,
}

impl HarvesterExecutor {
    pub fn new(config: HarvestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Extracts dependencies from one build and merges them into the stored
    /// document.
    #[instrument(skip(self, runner), fields(dir = %self.config.project_dir.display()))]
    pub async fn watch<R>(&self, runner: R) -> Result<ExtractionResult, HarvestError>
    where
        R: BuildRunner,
    {
        info!(
            "Gathering dependencies for project: {}",
            self.config.resolved_project_name()
        );

        ExtractionPipeline::from_config(runner, &self.config)
            .execute(&self.config.project_dir)
            .await
    }

    /// Sends the stored document to the collector, then removes the local
    /// document and buffer. On failure nothing is removed so the same
    /// document can be sent again.
    #[instrument(skip(self, transmitter), fields(dir = %self.config.project_dir.display()))]
    pub async fn send<T>(&self, transmitter: &T) -> Result<SendReport, HarvestError>
    where
        T: Transmitter + ?Sized,
    {
        let url = self.config.import_url()?;

        let error_log = ErrorLog::new(self.config.error_log_path());
        let had_errors = error_log.exists();
        if had_errors {
            error!(
                "There are errors that can affect the dependency report for this project! Please check the {} file!",
                error_log.path().display()
            );
        }

        let store = DocumentStore::new(self.config.document_path());
        let mut document = store.load()?;
        let project_name = self.config.resolved_project_name();
        document.project_name = Some(project_name.clone());
        store.persist(&document)?;

        let body = store.read_bytes()?;
        transmitter.transmit(&url, body).await?;

        store.remove()?;
        remove_if_present(&self.config.buffer_path())?;
        info!(entries = document.len(), "Removed local package document");

        Ok(SendReport {
            url,
            project_name,
            entries: document.len(),
            had_errors,
        })
    }
}
