//! Load and persist [`PackageDocument`] at its well-known path.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::model::PackageDocument;
use crate::traits::HarvestError;

/// File-backed home of the project's [`PackageDocument`].
///
/// No locking is performed: two processes writing the same path will race,
/// and the last writer wins.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    path: PathBuf,
}

impl DocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the stored document, or a fresh empty one when none exists.
    ///
    /// # Errors
    ///
    /// [`HarvestError::CorruptDocument`] when the file is not valid JSON or
    /// lacks one of the four collections.
    pub fn load_or_default(&self) -> Result<PackageDocument, HarvestError> {
        match self.read()? {
            Some(document) => Ok(document),
            None => {
                debug!(path = %self.path.display(), "No package document yet, starting fresh");
                Ok(PackageDocument::new())
            }
        }
    }

    /// Loads the stored document, failing if there is none.
    pub fn load(&self) -> Result<PackageDocument, HarvestError> {
        self.read()?
            .ok_or_else(|| HarvestError::MissingDocument(self.path.clone()))
    }

    fn read(&self) -> Result<Option<PackageDocument>, HarvestError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let document = serde_json::from_str(&content).map_err(|e| HarvestError::CorruptDocument {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(document))
    }

    /// Overwrites the file with `document`.
    pub fn persist(&self, document: &PackageDocument) -> Result<(), HarvestError> {
        let json = serde_json::to_string_pretty(document)?;
        fs::write(&self.path, json)?;
        info!(
            path = %self.path.display(),
            entries = document.len(),
            "Saved package document"
        );
        Ok(())
    }

    /// Reads the raw bytes that would be transmitted.
    pub fn read_bytes(&self) -> Result<Vec<u8>, HarvestError> {
        fs::read(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => HarvestError::MissingDocument(self.path.clone()),
            _ => e.into(),
        })
    }

    /// Deletes the document. Returns `false` if it was already gone.
    pub fn remove(&self) -> Result<bool, HarvestError> {
        remove_if_present(&self.path)
    }
}

/// Removes `path`, treating an absent file as success.
pub(crate) fn remove_if_present(path: &Path) -> Result<bool, HarvestError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
