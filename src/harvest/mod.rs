//! Harvest module - turns captured build output into a persisted document.
//!
//! - **Parser**: [`OutputParser`] recovers modules, failures and dependency blocks
//! - **Normalizer**: [`DependencyNormalizer`] types and routes raw entries
//! - **Storage**: [`DocumentStore`] and [`ErrorLog`] own the on-disk artifacts
//! - **Pipeline**: async executor via [`pipeline::ExtractionPipeline`]

pub mod document;
pub mod error_log;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod traits;

// Re-export commonly used types
pub use traits::{Diagnostic, HarvestStage, ModuleBoundary, ParseEvent, RawDependency};

pub use document::DocumentStore;
pub use error_log::ErrorLog;
pub use normalizer::{DependencyNormalizer, MergeSummary};
pub use parser::{FailureSpan, OutputParser, ParsedOutput};
pub use pipeline::{BufferFile, ExtractionPipeline, ExtractionResult, ExtractionStats};
