//! `Span` refers to a byte range within one translation unit, the way
//! `passerine::common::span::Span` refers to a range within a `Source` —
//! except a `Span` here is `Copy` and carries a `TranslationUnitId`
//! rather than an `Rc<Source>`, since spans are produced by the
//! thousands during lexing/reading and must stay cheap to move through
//! the reader's location table and the compiler's per-op line table.

use crate::common::source::TranslationUnitId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub translation_unit: TranslationUnitId,
    pub offset: usize,
    pub length: usize,
}

impl Span {
    pub fn new(translation_unit: TranslationUnitId, offset: usize, length: usize) -> Span {
        Span { translation_unit, offset, length }
    }

    pub fn point(translation_unit: TranslationUnitId, offset: usize) -> Span {
        Span { translation_unit, offset, length: 1 }
    }

    /// Spans the union of `a` and `b`. Both must share a translation unit.
    pub fn combine(a: Span, b: Span) -> Span {
        assert_eq!(a.translation_unit, b.translation_unit);
        let start = a.offset.min(b.offset);
        let end = (a.offset + a.length).max(b.offset + b.length);
        Span { translation_unit: a.translation_unit, offset: start, length: end - start }
    }
}

/// Pairs a value with the source range it was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spanned<T> {
    pub item: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(item: T, span: Span) -> Spanned<T> {
        Spanned { item, span }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn combine_spans() {
        let tu = TranslationUnitId(0);
        let a = Span::new(tu, 0, 5);
        let b = Span::new(tu, 11, 2);
        assert_eq!(Span::combine(a, b), Span::new(tu, 0, 13));
    }
}
