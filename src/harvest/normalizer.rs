//! Turns raw `module:group:artifact:type:version:scope` entries into typed
//! [`DependencyRecord`]s and routes them into a [`PackageDocument`].

use tracing::{debug, warn};

use crate::harvest::traits::{HarvestStage, RawDependency};
use crate::model::{DependencyRecord, PackageDocument, Scope};
use crate::traits::HarvestError;

const FIELD_COUNT: usize = 6;

/// Outcome of merging a batch of raw entries into a document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub stored: usize,
    pub malformed: usize,
    pub unrecognized_scope: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyNormalizer;

impl DependencyNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parses one raw entry.
    ///
    /// Returns `Ok(None)` for a well-formed entry whose scope is not one of
    /// the four tracked scopes.
    ///
    /// # Errors
    ///
    /// [`HarvestError::MalformedDependencyLine`] unless the line splits into
    /// exactly six non-empty fields.
    pub fn normalize(&self, line: &str) -> Result<Option<DependencyRecord>, HarvestError> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() != FIELD_COUNT || fields.iter().any(|f| f.is_empty()) {
            return Err(HarvestError::MalformedDependencyLine {
                line: line.to_string(),
            });
        }

        let Some(scope) = Scope::from_label(fields[5]) else {
            return Ok(None);
        };

        Ok(Some(DependencyRecord {
            module_name: fields[0].to_string(),
            group_id: fields[1].to_string(),
            artifact_id: fields[2].to_string(),
            artifact_type: fields[3].to_string(),
            version: fields[4].to_string(),
            scope,
        }))
    }

    /// Normalizes every entry and appends the tracked ones to `document`.
    ///
    /// Malformed entries are logged and skipped; entries with an untracked
    /// scope are dropped silently.
    ///
    /// # Errors
    ///
    /// Any [`HarvestError`] for which [`HarvestError::is_fatal`] holds.
    /// Entries appended before it stay in `document`.
    pub fn merge_into(
        &self,
        entries: &[RawDependency],
        document: &mut PackageDocument,
    ) -> Result<MergeSummary, HarvestError> {
        let mut summary = MergeSummary::default();
        for entry in entries {
            match self.execute(entry.line()) {
                Ok(Some(record)) => {
                    document.append(&record);
                    summary.stored += 1;
                }
                Ok(None) => {
                    debug!(entry = %entry, "Dropping dependency with untracked scope");
                    summary.unrecognized_scope += 1;
                }
                Err(e) if !e.is_fatal() => {
                    warn!(stage = self.stage_name(), "Skipping entry: {}", e);
                    summary.malformed += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(summary)
    }
}

impl HarvestStage for DependencyNormalizer {
    type Input = String;
    type Output = Option<DependencyRecord>;
    type Error = HarvestError;

    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        self.normalize(&input)
    }

    fn stage_name(&self) -> &'static str {
        "dependency_normalizer"
    }
}
