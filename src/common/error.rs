//! Structured error records (spec §4H, §7).
//!
//! The core never writes to a stream itself; it builds `Diagnostic`s and
//! hands them to the host's `error_fn` callback (`VmConfig::error_fn`).
//! Rendering line/column information is the presentation layer's job —
//! `Diagnostic::render` is provided as a convenience for hosts that don't
//! want to do it themselves, the way `passerine::common::span::Span`
//! implements `Display` for its own callers without that being part of
//! the compiler pipeline proper.

use std::fmt;

use crate::common::source::Source;
use crate::common::span::Span;

/// Which stage raised the diagnostic. Used by `Vm::interpret` to decide
/// between the `compile-error` and `runtime-error` outcomes (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lex,
    Read,
    Compile,
    Runtime,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::Lex => "lex error",
            DiagnosticKind::Read => "read error",
            DiagnosticKind::Compile => "compile error",
            DiagnosticKind::Runtime => "runtime error",
        };
        write!(f, "{}", s)
    }
}

/// One error record, exactly `{translation_unit_id, byte_offset,
/// byte_length, kind, message}` from spec §4H.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: Span,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(span: Span, kind: DiagnosticKind, message: impl Into<String>) -> Diagnostic {
        Diagnostic { span, kind, message: message.into() }
    }

    /// Renders the diagnostic against its source, recovering line/column
    /// lazily. Never called on the compile/execute hot path.
    pub fn render(&self, source: &Source) -> String {
        let (line, col) = source.line_col(self.span.offset);
        format!("{}:{}:{}: {}: {}", source.name, line, col, self.kind, self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// The three-way result of `Vm::interpret` (§6, §7).
#[derive(Debug)]
pub enum Outcome {
    Ok(crate::value::Value),
    CompileError(Vec<Diagnostic>),
    RuntimeError(Diagnostic),
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }
}
