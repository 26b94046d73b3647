//! Run configuration.
//!
//! All artifact paths are resolved relative to the project directory, which is
//! where the build tool runs and where the collector expects to find them.

use std::path::PathBuf;
use std::time::Duration;

use crate::harvest::traits::ModuleBoundary;
use crate::traits::HarvestError;

pub const DOCUMENT_FILENAME: &str = "dmuncle-package.json";
pub const BUFFER_FILENAME: &str = "dmuncle-buffer-file.txt";
pub const ERRORS_FILENAME: &str = "dmuncle-errors-log.txt";

/// Route appended to the server address when transmitting.
pub const IMPORT_ROUTE: &str = "/import";

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub project_dir: PathBuf,
    pub document_filename: String,
    pub buffer_filename: String,
    pub errors_filename: String,

    /// Build tool executable (default: `mvn`)
    pub build_command: String,
    pub module_boundary: ModuleBoundary,

    /// Collector base address, e.g. `http://collector:8080`
    pub server_address: Option<String>,
    pub project_name: Option<String>,

    /// Upper bound on the build invocation (default: none)
    pub build_timeout: Option<Duration>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            document_filename: DOCUMENT_FILENAME.to_string(),
            buffer_filename: BUFFER_FILENAME.to_string(),
            errors_filename: ERRORS_FILENAME.to_string(),
            build_command: "mvn".to_string(),
            module_boundary: ModuleBoundary::default(),
            server_address: None,
            project_name: None,
            build_timeout: None,
        }
    }
}

impl HarvestConfig {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_server_address(mut self, address: impl Into<String>) -> Self {
        self.server_address = Some(address.into());
        self
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn document_path(&self) -> PathBuf {
        self.project_dir.join(&self.document_filename)
    }

    pub fn buffer_path(&self) -> PathBuf {
        self.project_dir.join(&self.buffer_filename)
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.project_dir.join(&self.errors_filename)
    }

    /// The configured project name, falling back to the project directory's
    /// name.
    pub fn resolved_project_name(&self) -> String {
        if let Some(name) = &self.project_name {
            return name.clone();
        }
        self.project_dir
            .canonicalize()
            .unwrap_or_else(|_| self.project_dir.clone())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string())
    }

    /// Full collector URL for uploads.
    ///
    /// # Errors
    ///
    /// [`HarvestError::Config`] if no server address is configured.
    pub fn import_url(&self) -> Result<String, HarvestError> {
        let address = self
            .server_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| HarvestError::Config("a server address is required".to_string()))?;
        Ok(format!("{}{}", address.trim_end_matches('/'), IMPORT_ROUTE))
    }
}
