//! Recoverable conversion diagnostics
//!
//! Conditions that do not abort a conversion (an unsupported extension, a
//! tangent frame that cannot be computed, ...) are reported through a
//! [`Logger`] instead of being returned as errors. The converter always
//! continues with a documented fallback after emitting one.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Closed set of recoverable conditions the converter knows how to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    UnsupportedExtension,
    UnsupportedAlphaMode,
    UnsupportedTextureParameter,
    UnsupportedChannelPath,
    FailedToCalculateTangents,
    EmptyMorph,
    ReferenceSkinInDifferentScene,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedExtension => "UnsupportedExtension",
            Self::UnsupportedAlphaMode => "UnsupportedAlphaMode",
            Self::UnsupportedTextureParameter => "UnsupportedTextureParameter",
            Self::UnsupportedChannelPath => "UnsupportedChannelPath",
            Self::FailedToCalculateTangents => "FailedToCalculateTangents",
            Self::EmptyMorph => "EmptyMorph",
            Self::ReferenceSkinInDifferentScene => "ReferenceSkinInDifferentScene",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reported condition
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: LogLevel,
    /// `None` for plain informational/debug messages
    pub kind: Option<DiagnosticKind>,
    pub message: String,
}

/// Sink for diagnostics
pub trait Logger {
    fn log(&self, diagnostic: &Diagnostic);
}

impl<F> Logger for F
where
    F: Fn(&Diagnostic),
{
    fn log(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Convenience emitters shared by every converter stage
pub(crate) trait LoggerExt {
    fn emit(&self, level: LogLevel, kind: Option<DiagnosticKind>, message: String);

    fn debug(&self, message: impl Into<String>) {
        self.emit(LogLevel::Debug, None, message.into());
    }

    fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, None, message.into());
    }

    fn warn(&self, kind: DiagnosticKind, message: impl Into<String>) {
        self.emit(LogLevel::Warning, Some(kind), message.into());
    }

    fn error(&self, kind: Option<DiagnosticKind>, message: impl Into<String>) {
        self.emit(LogLevel::Error, kind, message.into());
    }
}

impl LoggerExt for dyn Logger + '_ {
    fn emit(&self, level: LogLevel, kind: Option<DiagnosticKind>, message: String) {
        self.log(&Diagnostic {
            level,
            kind,
            message,
        });
    }
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, d: &Diagnostic) {
        let kind = d.kind.map(DiagnosticKind::as_str).unwrap_or("-");
        match d.level {
            LogLevel::Debug => tracing::debug!(kind, "{}", d.message),
            LogLevel::Info => tracing::info!(kind, "{}", d.message),
            LogLevel::Warning => tracing::warn!(kind, "{}", d.message),
            LogLevel::Error => tracing::error!(kind, "{}", d.message),
        }
    }
}

/// Keeps every diagnostic in memory
///
/// Clones share the same storage, so a caller can hand one clone to the
/// converter and inspect the records through another.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    records: Rc<RefCell<Vec<Diagnostic>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Diagnostic> {
        self.records.borrow().clone()
    }

    /// All records of the given kind
    pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<Diagnostic> {
        self.records
            .borrow()
            .iter()
            .filter(|d| d.kind == Some(kind))
            .cloned()
            .collect()
    }

    pub fn count_at_least(&self, level: LogLevel) -> usize {
        self.records
            .borrow()
            .iter()
            .filter(|d| d.level >= level)
            .count()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, diagnostic: &Diagnostic) {
        self.records.borrow_mut().push(diagnostic.clone());
    }
}
