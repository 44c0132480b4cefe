//! Recursive-descent reader (spec §4D): turns a token stream into
//! first-class values allocated through the VM, recording each node's
//! source span in an auxiliary table keyed by value identity (the
//! node's NaN-boxed bit pattern). Numbers and the `nil`/`true`
//! singletons are not heap pointers, so two occurrences of the same
//! literal collide in that table; this mirrors the NaN-boxed value
//! representation itself and only affects which span a diagnostic blames
//! when a literal (rather than a whole form) is at fault.

use std::collections::HashMap;

use crate::common::error::{Diagnostic, DiagnosticKind};
use crate::common::source::TranslationUnitId;
use crate::common::span::Span;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::value::Value;
use crate::vm::Vm;

pub type Locations = HashMap<u64, Span>;

struct Cursor<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str, tu: TranslationUnitId) -> Cursor<'a> {
        let mut lexer = Lexer::new(source, tu);
        Self::skip_comments(&mut lexer);
        Cursor { lexer }
    }

    fn skip_comments(lexer: &mut Lexer<'a>) {
        while lexer.peek().kind == TokenKind::Comment {
            lexer.advance();
        }
    }

    fn peek(&self) -> Token {
        self.lexer.peek()
    }

    fn advance(&mut self) -> Token {
        let tok = self.lexer.advance();
        Self::skip_comments(&mut self.lexer);
        tok
    }

    fn into_lexer_diagnostics(self) -> Vec<Diagnostic> {
        self.lexer.diagnostics
    }
}

fn span_of(v: Value, locations: &Locations, fallback: Span) -> Span {
    locations.get(&v.raw_bits()).copied().unwrap_or(fallback)
}

/// Reads every top-level form out of `source`. On the first read error
/// (spec §4D: "on a lex-layer failure the reader emits a higher-level
/// reader-error and halts the top-level read"), stops and returns what
/// was read so far plus every diagnostic produced, lexer errors first
/// since those occur strictly ahead of the forms they're embedded in.
pub fn read_all(source: &str, tu: TranslationUnitId, vm: &mut Vm, locations: &mut Locations) -> (Vec<Value>, Vec<Diagnostic>) {
    let mut cursor = Cursor::new(source, tu);
    let mut diagnostics = Vec::new();
    let mut forms = Vec::new();
    // A list under construction (`read_list`/`read_list_tail`'s `head`,
    // a quoted form's `tail`) sits in a Rust local between two VM
    // allocations, unreachable from any GC root until it's passed to
    // the next `alloc_cons`. Forbidding collection for the whole read
    // is the discipline spec §5 describes for a critical section that
    // cannot otherwise pin every intermediate individually.
    vm.gc.push_forbid();
    while cursor.peek().kind != TokenKind::Eof {
        match read_expr(&mut cursor, source, vm, locations, &mut diagnostics) {
            Some(v) => forms.push(v),
            None => break,
        }
    }
    vm.gc.pop_forbid();
    let mut all = cursor.into_lexer_diagnostics();
    all.extend(diagnostics);
    (forms, all)
}

fn read_expr(cursor: &mut Cursor, source: &str, vm: &mut Vm, locations: &mut Locations, diagnostics: &mut Vec<Diagnostic>) -> Option<Value> {
    let tok = cursor.advance();
    match tok.kind {
        TokenKind::Number(n) => {
            let v = Value::num(n);
            locations.insert(v.raw_bits(), tok.span);
            Some(v)
        }
        TokenKind::Symbol => {
            let text = &source[tok.span.offset..tok.span.offset + tok.span.length];
            let v = vm.intern(text);
            locations.insert(v.raw_bits(), tok.span);
            Some(v)
        }
        TokenKind::Quote => match read_expr(cursor, source, vm, locations, diagnostics) {
            Some(inner) => {
                let inner_span = span_of(inner, locations, tok.span);
                let nil = Value::nil();
                let tail = vm.alloc_cons(inner, nil);
                let quote_sym = vm.intern("quote");
                let list = vm.alloc_cons(quote_sym, tail);
                locations.insert(list.raw_bits(), Span::combine(tok.span, inner_span));
                Some(list)
            }
            None => None,
        },
        TokenKind::LParen => read_list(tok.span, cursor, source, vm, locations, diagnostics),
        TokenKind::Dot => {
            diagnostics.push(Diagnostic::new(tok.span, DiagnosticKind::Read, "stray dot"));
            None
        }
        TokenKind::RParen => {
            diagnostics.push(Diagnostic::new(tok.span, DiagnosticKind::Read, "unexpected token at top level"));
            None
        }
        TokenKind::Unexpected => {
            diagnostics.push(Diagnostic::new(tok.span, DiagnosticKind::Read, "unexpected token"));
            None
        }
        TokenKind::Eof => {
            diagnostics.push(Diagnostic::new(tok.span, DiagnosticKind::Read, "unexpected end of input"));
            None
        }
        TokenKind::Comment => unreachable!("Cursor filters comments out before the grammar sees them"),
    }
}

/// `list-body` after the opening `(` has already been consumed.
/// `open_span` is the `(`'s span, noted on a missing-rparen diagnostic.
fn read_list(open_span: Span, cursor: &mut Cursor, source: &str, vm: &mut Vm, locations: &mut Locations, diagnostics: &mut Vec<Diagnostic>) -> Option<Value> {
    match cursor.peek().kind {
        TokenKind::RParen => {
            cursor.advance();
            Some(Value::nil())
        }
        TokenKind::Dot => {
            let dot = cursor.advance();
            diagnostics.push(Diagnostic::new(dot.span, DiagnosticKind::Read, "stray dot"));
            None
        }
        TokenKind::Eof => {
            diagnostics.push(Diagnostic::new(open_span, DiagnosticKind::Read, "missing rparen"));
            None
        }
        _ => {
            let head = read_expr(cursor, source, vm, locations, diagnostics)?;
            let tail = read_list_tail(open_span, cursor, source, vm, locations, diagnostics)?;
            let tail_span = span_of(tail, locations, open_span);
            let list = vm.alloc_cons(head, tail);
            locations.insert(list.raw_bits(), Span::combine(open_span, tail_span));
            Some(list)
        }
    }
}

/// `list-tail ::= ')' | '.' expr ')' | expr list-tail`.
fn read_list_tail(open_span: Span, cursor: &mut Cursor, source: &str, vm: &mut Vm, locations: &mut Locations, diagnostics: &mut Vec<Diagnostic>) -> Option<Value> {
    match cursor.peek().kind {
        TokenKind::RParen => {
            cursor.advance();
            Some(Value::nil())
        }
        TokenKind::Dot => {
            cursor.advance();
            let tail_expr = read_expr(cursor, source, vm, locations, diagnostics)?;
            match cursor.peek().kind {
                TokenKind::RParen => {
                    cursor.advance();
                    Some(tail_expr)
                }
                TokenKind::Eof => {
                    diagnostics.push(Diagnostic::new(open_span, DiagnosticKind::Read, "missing rparen"));
                    None
                }
                _ => {
                    let bad = cursor.advance();
                    diagnostics.push(Diagnostic::new(bad.span, DiagnosticKind::Read, "expected ')' after dotted tail"));
                    None
                }
            }
        }
        TokenKind::Eof => {
            diagnostics.push(Diagnostic::new(open_span, DiagnosticKind::Read, "missing rparen"));
            None
        }
        _ => {
            let head = read_expr(cursor, source, vm, locations, diagnostics)?;
            let rest = read_list_tail(open_span, cursor, source, vm, locations, diagnostics)?;
            Some(vm.alloc_cons(head, rest))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vm::VmConfig;

    fn read_one(src: &str) -> (Option<Value>, Vec<Diagnostic>) {
        let mut vm = Vm::new(VmConfig::default());
        let mut locations = Locations::new();
        let (mut forms, diags) = read_all(src, TranslationUnitId(0), &mut vm, &mut locations);
        (forms.pop(), diags)
    }

    #[test]
    fn reads_proper_list() {
        let (v, diags) = read_one("(1 2 3)");
        assert!(diags.is_empty());
        let v = v.unwrap();
        assert_eq!(v.car().unwrap_num(), 1.0);
        assert_eq!(v.cdr().car().unwrap_num(), 2.0);
        assert_eq!(v.cdr().cdr().car().unwrap_num(), 3.0);
        assert!(v.cdr().cdr().cdr().is_nil());
    }

    #[test]
    fn reads_dotted_pair() {
        let (v, diags) = read_one("(1 . 2)");
        assert!(diags.is_empty());
        let v = v.unwrap();
        assert_eq!(v.car().unwrap_num(), 1.0);
        assert_eq!(v.cdr().unwrap_num(), 2.0);
    }

    #[test]
    fn quote_desugars_to_quote_form() {
        let (v, diags) = read_one("'x");
        assert!(diags.is_empty());
        let v = v.unwrap();
        assert_eq!(v.car().unwrap_symbol_name(), "quote");
        assert_eq!(v.cdr().car().unwrap_symbol_name(), "x");
        assert!(v.cdr().cdr().is_nil());
    }

    #[test]
    fn missing_rparen_is_an_error() {
        let (v, diags) = read_one("(1 2");
        assert!(v.is_none());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "missing rparen");
    }

    #[test]
    fn stray_dot_is_an_error() {
        let (v, diags) = read_one("(. 1)");
        assert!(v.is_none());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "stray dot");
    }

    #[test]
    fn reading_under_stress_gc_does_not_collect_in_flight_intermediates() {
        // Every allocation collects first in stress mode (spec §4B); if
        // `read_all` didn't forbid collection for its own duration, the
        // `head`/`tail` locals `read_list`/`read_list_tail` hold between
        // two `alloc_cons` calls would dangle as soon as a later element's
        // allocation triggered a sweep.
        let mut vm = Vm::new(VmConfig { stress_gc: true, ..VmConfig::default() });
        let mut locations = Locations::new();
        let (forms, diags) = read_all("'(1 (2 3) . (4 . 5))", TranslationUnitId(0), &mut vm, &mut locations);
        assert!(diags.is_empty());
        let quoted = forms[0].cdr().car();
        assert_eq!(quoted.car().unwrap_num(), 1.0);
        let second = quoted.cdr().car();
        assert_eq!(second.car().unwrap_num(), 2.0);
        assert_eq!(second.cdr().car().unwrap_num(), 3.0);
        let tail = quoted.cdr().cdr();
        assert_eq!(tail.car().unwrap_num(), 4.0);
        assert_eq!(tail.cdr().unwrap_num(), 5.0);
    }

    #[test]
    fn symbols_read_from_the_same_text_are_interned() {
        let mut vm = Vm::new(VmConfig::default());
        let mut locations = Locations::new();
        let (forms, diags) = read_all("foo foo", TranslationUnitId(0), &mut vm, &mut locations);
        assert!(diags.is_empty());
        assert_eq!(forms[0], forms[1]);
    }
}
