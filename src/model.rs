use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Usage classification of a resolved dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Compile,
    Runtime,
    System,
    Test,
}

impl Scope {
    /// Exact, case-sensitive match against the four recognised scope names.
    ///
    /// Anything else (`provided`, `import`, `Compile`, ...) yields `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "compile" => Some(Scope::Compile),
            "runtime" => Some(Scope::Runtime),
            "system" => Some(Scope::System),
            "test" => Some(Scope::Test),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Scope::Compile => "compile",
            Scope::Runtime => "runtime",
            Scope::System => "system",
            Scope::Test => "test",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One resolved dependency, as recovered from a single build output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    pub group_id: String,
    pub artifact_id: String,
    pub artifact_type: String, // e.g. "jar", "pom"
    pub version: String,
    pub scope: Scope,
    pub module_name: String,
}

/// Persisted shape of a dependency. The scope is not stored per entry; it is
/// encoded by which collection of [`PackageDocument`] holds the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub module_name: String,
}

impl From<&DependencyRecord> for StoredDependency {
    fn from(record: &DependencyRecord) -> Self {
        Self {
            group_id: record.group_id.clone(),
            artifact_id: record.artifact_id.clone(),
            version: record.version.clone(),
            module_name: record.module_name.clone(),
        }
    }
}

/// The accumulated dependency report for one project.
///
/// All four collections are required when deserializing; a document missing
/// any of them is rejected rather than partially recovered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDocument {
    pub compile_artifacts: Vec<StoredDependency>,
    pub test_compile_artifacts: Vec<StoredDependency>,
    pub runtime_artifacts: Vec<StoredDependency>,
    /// Holds `system` scoped dependencies. The key name is historical and is
    /// kept as-is for collector compatibility.
    pub test_runtime_artifacts: Vec<StoredDependency>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    /// Keys written by other tools, carried through untouched.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl PackageDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record` to the collection selected by its scope.
    ///
    /// Existing entries are never inspected: appending the same record twice
    /// stores it twice.
    pub fn append(&mut self, record: &DependencyRecord) {
        self.collection_mut(record.scope).push(StoredDependency::from(record));
    }

    pub fn collection(&self, scope: Scope) -> &[StoredDependency] {
        match scope {
            Scope::Compile => &self.compile_artifacts,
            Scope::Test => &self.test_compile_artifacts,
            Scope::Runtime => &self.runtime_artifacts,
            Scope::System => &self.test_runtime_artifacts,
        }
    }

    fn collection_mut(&mut self, scope: Scope) -> &mut Vec<StoredDependency> {
        match scope {
            Scope::Compile => &mut self.compile_artifacts,
            Scope::Test => &mut self.test_compile_artifacts,
            Scope::Runtime => &mut self.runtime_artifacts,
            Scope::System => &mut self.test_runtime_artifacts,
        }
    }

    /// Total number of stored entries across all collections.
    pub fn len(&self) -> usize {
        self.compile_artifacts.len()
            + self.test_compile_artifacts.len()
            + self.runtime_artifacts.len()
            + self.test_runtime_artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
