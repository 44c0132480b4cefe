//! A `Source` is one translation unit: a name (typically a file path, but
//! the embedder may pass anything) paired with the text it names.
//!
//! Sources are owned by the `Vm` for the lifetime of the interpretation
//! that produced them, and are kept around after compilation finishes so
//! that diagnostics can recover line/column information on demand
//! (spec §4H — line/column are computed lazily, not stored per-token).

use std::fmt;

/// Identifies a `Source` within a `Vm`'s translation-unit table.
/// Stable for the lifetime of the `Vm`; used by `Span` and `Diagnostic`
/// instead of an owned reference so that spans stay `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TranslationUnitId(pub u32);

/// One unit of source text, as handed to `Vm::interpret`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub contents: String,
}

impl Source {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Source {
        Source { name: name.into(), contents: contents.into() }
    }

    /// Converts a byte offset into a 1-indexed (line, column) pair.
    /// Walks the source once; only ever called when rendering a
    /// diagnostic, never on the hot compile/execute path.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for (i, byte) in self.contents.bytes().enumerate() {
            if i == offset {
                break;
            }
            if byte == b'\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn line_col_tracks_newlines() {
        let source = Source::new("<test>", "(print 1)\n(print 2)\n");
        assert_eq!(source.line_col(0), (1, 1));
        assert_eq!(source.line_col(10), (2, 1));
    }
}
