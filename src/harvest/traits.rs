//! Core traits and types shared by the extraction stages.
//!
//! - Stage abstraction via [`HarvestStage`]
//! - Parser output via [`ParseEvent`], [`RawDependency`] and [`Diagnostic`]
//! - Module boundary selection via [`ModuleBoundary`]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Module name used when dependency lines appear before any module
/// announcement.
pub const UNKNOWN_MODULE: &str = "<unknown>";

// ============================================================================
// Stage Trait
// ============================================================================

/// Generic extraction stage that transforms Input → Output.
///
/// Stages are plain synchronous transformations; the pipeline decides where
/// they run.
///
/// # Examples
///
/// ```ignore
/// struct Uppercase;
///
/// impl HarvestStage for Uppercase {
///     type Input = String;
///     type Output = String;
///     type Error = std::convert::Infallible;
///
///     fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
///         Ok(input.to_uppercase())
///     }
///
///     fn stage_name(&self) -> &'static str {
///         "uppercase"
///     }
/// }
/// ```
pub trait HarvestStage: Send + Sync {
    /// Input type consumed by this stage
    type Input;

    /// Output type produced by this stage
    type Output;

    /// Error type for stage failures
    type Error: std::error::Error + Send + Sync + 'static;

    /// Executes the stage.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the input cannot be transformed.
    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error>;

    /// Returns a human-readable name for this stage.
    ///
    /// Used for logging and timeout reporting.
    fn stage_name(&self) -> &'static str;
}

// ============================================================================
// Module Boundaries
// ============================================================================

/// How the parser recognises the start of a new module in build output.
///
/// One strategy is chosen per run; the parser never guesses which one a log
/// was written with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleBoundary {
    /// `--- maven-dependency-plugin:3.6.0:list (default-cli) @ core ---`
    #[default]
    PluginInvocation,

    /// `Building core 1.0-SNAPSHOT [2/3]`
    ///
    /// The module name is the project's display name, not its artifact id.
    /// Any `:` in it (e.g. `Shop :: Core`) is replaced with `-` so the stored
    /// entry keeps exactly six colon-separated fields.
    BuildingBanner,
}

// ============================================================================
// Parser Output
// ============================================================================

/// One line from a dependency block, tagged with the module active when it
/// was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDependency {
    /// `None` until the first module announcement
    pub module: Option<String>,

    /// Undecorated coordinates, e.g. `org.slf4j:slf4j-api:jar:1.7.36:compile`
    pub coordinates: String,
}

impl RawDependency {
    pub fn module_name(&self) -> &str {
        self.module.as_deref().unwrap_or(UNKNOWN_MODULE)
    }

    /// The canonical `module:group:artifact:type:version:scope` form.
    pub fn line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RawDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module_name(), self.coordinates)
    }
}

/// Build-failure diagnostics recovered from output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A `BUILD FAILURE` announcement while `module` was active.
    BuildFailure { module: Option<String> },

    /// An error-severity line seen after a failure announcement. `module` is
    /// the module recorded at the most recent failure.
    ErrorLine { module: Option<String>, line: String },
}

impl Diagnostic {
    pub fn module(&self) -> Option<&str> {
        match self {
            Diagnostic::BuildFailure { module } | Diagnostic::ErrorLine { module, .. } => {
                module.as_deref()
            }
        }
    }
}

/// Single event produced by the parser for one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    Dependency(RawDependency),
    Diagnostic(Diagnostic),
}

// ============================================================================
// Tests
// ============================================================================
