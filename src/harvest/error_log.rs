//! Append-only log of build failures.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::harvest::parser::FailureSpan;
use crate::harvest::traits::UNKNOWN_MODULE;
use crate::traits::HarvestError;

#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether any failure has ever been recorded for this project.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Writes `module` followed by each of `lines`, one per line. The file is
    /// created on first use and never truncated.
    pub fn append<S: AsRef<str>>(&self, module: &str, lines: &[S]) -> Result<(), HarvestError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "{module}")?;
        for line in lines {
            writeln!(writer, "{}", line.as_ref())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Records every failure span, in order.
    pub fn record(&self, spans: &[FailureSpan]) -> Result<(), HarvestError> {
        for span in spans {
            let module = span.module.as_deref().unwrap_or(UNKNOWN_MODULE);
            warn!(
                module,
                errors = span.lines.len(),
                log = %self.path.display(),
                "Build failure recorded"
            );
            self.append(module, &span.lines)?;
        }
        Ok(())
    }
}
