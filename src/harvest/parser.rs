//! Single-pass scanner over captured build output.
//!
//! [`OutputParser`] walks the output once, front to back, and recovers:
//! - the module each line belongs to
//! - build failure announcements and the error lines that follow them
//! - dependency blocks (`The following files have been resolved:`)
//!
//! Lines that match nothing are inert. The scan never fails.

use std::collections::VecDeque;
use std::convert::Infallible;

use crate::harvest::traits::{Diagnostic, HarvestStage, ModuleBoundary, ParseEvent, RawDependency};

const BLOCK_OPENING: &str = "The following files have been resolved:";
const FAILURE_MARKER: &str = "BUILD FAILURE";
const NO_DEPENDENCIES: &str = "none";
const LEVEL_TAGS: [&str; 5] = ["[INFO]", "[WARNING]", "[WARN]", "[ERROR]", "[DEBUG]"];
const ERROR_TAG: &str = "[ERROR]";
const MODULE_SEPARATOR_REPLACEMENT: &str = "-";

/// Removes a leading log-level tag, returning the rest of the line untrimmed.
pub fn strip_level(line: &str) -> &str {
    let trimmed = line.trim_start();
    LEVEL_TAGS
        .iter()
        .find_map(|tag| trimmed.strip_prefix(tag))
        .unwrap_or(line)
}

fn is_error_line(line: &str) -> bool {
    line.trim_start().starts_with(ERROR_TAG)
}

/// Everything recovered from one build output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    pub dependencies: Vec<RawDependency>,
    pub diagnostics: Vec<Diagnostic>,
    pub lines_scanned: usize,
}

/// A failed module and the error lines reported after its failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureSpan {
    pub module: Option<String>,
    pub lines: Vec<String>,
}

impl ParsedOutput {
    /// Groups diagnostics by failure announcement, in output order.
    pub fn failure_spans(&self) -> Vec<FailureSpan> {
        let mut spans: Vec<FailureSpan> = Vec::new();
        for diagnostic in &self.diagnostics {
            match diagnostic {
                Diagnostic::BuildFailure { module } => spans.push(FailureSpan {
                    module: module.clone(),
                    lines: Vec::new(),
                }),
                Diagnostic::ErrorLine { line, .. } => match spans.last_mut() {
                    Some(span) => span.lines.push(line.clone()),
                    None => spans.push(FailureSpan {
                        module: diagnostic.module().map(str::to_string),
                        lines: vec![line.clone()],
                    }),
                },
            }
        }
        spans
    }
}

#[derive(Debug, Default)]
struct ScanState {
    current_module: Option<String>,
    failed_module: Option<String>,
    in_failure: bool,
    in_block: bool,
}

/// Line-oriented state machine over build tool output.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputParser {
    boundary: ModuleBoundary,
}

impl OutputParser {
    pub fn new(boundary: ModuleBoundary) -> Self {
        Self { boundary }
    }

    pub fn boundary(&self) -> ModuleBoundary {
        self.boundary
    }

    /// Lazily scans `lines`, yielding events as they are discovered.
    pub fn events<I, S>(&self, lines: I) -> ParseEvents<I::IntoIter>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ParseEvents {
            parser: *self,
            lines: lines.into_iter(),
            state: ScanState::default(),
            pending: VecDeque::new(),
            lines_scanned: 0,
        }
    }

    /// Scans all of `lines` and collects the results.
    pub fn parse<I, S>(&self, lines: I) -> ParsedOutput
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut events = self.events(lines);
        let mut output = ParsedOutput::default();
        for event in events.by_ref() {
            match event {
                ParseEvent::Dependency(dep) => output.dependencies.push(dep),
                ParseEvent::Diagnostic(diag) => output.diagnostics.push(diag),
            }
        }
        output.lines_scanned = events.lines_scanned();
        output
    }

    /// Extracts a module name if `line` announces the start of a module.
    pub fn detect_module(&self, line: &str) -> Option<String> {
        let content = strip_level(line).trim();
        let module = match self.boundary {
            ModuleBoundary::PluginInvocation => {
                if !(content.contains("maven-dependency-plugin:")
                    || content.starts_with("--- dependency:"))
                {
                    return None;
                }
                let (_, after) = content.split_once('@')?;
                after.split("---").next().unwrap_or_default().trim()
            }
            ModuleBoundary::BuildingBanner => {
                let rest = content.strip_prefix("Building ")?.trim();
                // "Building jar: /path/to/core.jar" is packaging output
                if rest.split_whitespace().next()?.ends_with(':') {
                    return None;
                }
                strip_reactor_counter(rest)
            }
        };

        if module.is_empty() {
            None
        } else {
            // Names end up as the first field of a colon-separated entry
            Some(module.replace(':', MODULE_SEPARATOR_REPLACEMENT))
        }
    }

    fn scan_line(&self, state: &mut ScanState, line: &str, out: &mut VecDeque<ParseEvent>) {
        if let Some(module) = self.detect_module(line) {
            state.current_module = Some(module);
        }

        if line.contains(FAILURE_MARKER) {
            state.in_failure = true;
            state.failed_module = state.current_module.clone();
            out.push_back(ParseEvent::Diagnostic(Diagnostic::BuildFailure {
                module: state.failed_module.clone(),
            }));
        }

        if state.in_failure && is_error_line(line) {
            out.push_back(ParseEvent::Diagnostic(Diagnostic::ErrorLine {
                module: state.failed_module.clone(),
                line: line.trim_end().to_string(),
            }));
        }

        let content = strip_level(line).trim();
        let opens_block = line.contains(BLOCK_OPENING);
        if opens_block {
            state.in_block = true;
        } else if state.in_block && content.is_empty() {
            state.in_block = false;
        }

        if state.in_block && !opens_block && content != NO_DEPENDENCIES {
            // Newer plugins append "-- module foo (auto)" after the coordinates.
            let coordinates = content.split_whitespace().next().unwrap_or(content);
            out.push_back(ParseEvent::Dependency(RawDependency {
                module: state.current_module.clone(),
                coordinates: coordinates.to_string(),
            }));
        }
    }
}

fn strip_reactor_counter(banner: &str) -> &str {
    if let Some(open) = banner.rfind('[') {
        let counter = &banner[open..];
        let inner = counter.trim_start_matches('[').trim_end_matches(']');
        let is_counter = counter.ends_with(']')
            && inner
                .split_once('/')
                .map(|(a, b)| {
                    !a.is_empty()
                        && !b.is_empty()
                        && a.chars().all(|c| c.is_ascii_digit())
                        && b.chars().all(|c| c.is_ascii_digit())
                })
                .unwrap_or(false);
        if is_counter {
            return banner[..open].trim_end();
        }
    }
    banner
}

/// Iterator returned by [`OutputParser::events`].
pub struct ParseEvents<I> {
    parser: OutputParser,
    lines: I,
    state: ScanState,
    pending: VecDeque<ParseEvent>,
    lines_scanned: usize,
}

impl<I> ParseEvents<I> {
    /// Number of input lines consumed so far.
    pub fn lines_scanned(&self) -> usize {
        self.lines_scanned
    }
}

impl<I, S> Iterator for ParseEvents<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = ParseEvent;

    fn next(&mut self) -> Option<ParseEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            let line = self.lines.next()?;
            self.lines_scanned += 1;
            self.parser
                .scan_line(&mut self.state, line.as_ref(), &mut self.pending);
        }
    }
}

impl HarvestStage for OutputParser {
    type Input = Vec<String>;
    type Output = ParsedOutput;
    type Error = Infallible;

    fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        Ok(self.parse(input))
    }

    fn stage_name(&self) -> &'static str {
        "output_parser"
    }
}

// ============================================================================
// Tests
// ============================================================================
