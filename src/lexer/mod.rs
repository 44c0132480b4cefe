//! The token scanner (spec §4C). A peekable cursor over a source
//! buffer: `peek` produces the current token without consuming it,
//! `advance` commits and scans the next. Once `eof` is yielded it keeps
//! yielding `eof`.

use crate::common::error::{Diagnostic, DiagnosticKind};
use crate::common::source::TranslationUnitId;
use crate::common::span::Span;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    Quote,
    Dot,
    Number(f64),
    Symbol,
    /// A `;...` run to end of line. Never reaches the reader's grammar —
    /// `reader::Cursor` filters these the way whitespace is filtered
    /// here — but is a real token kind per spec §4C, not folded into
    /// whitespace, so a future tool could consume comments too.
    Comment,
    Eof,
    Unexpected,
}

#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

const SYMBOL_PUNCT: &[u8] = b"+-*/@$%^&_=<>~?![]{}.";

fn is_symbol_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || SYMBOL_PUNCT.contains(&b)
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0c | 0x0b)
}

pub struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
    tu: TranslationUnitId,
    current: Token,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, tu: TranslationUnitId) -> Lexer<'a> {
        let mut lexer = Lexer { bytes: source.as_bytes(), pos: 0, tu, current: Token { kind: TokenKind::Eof, span: Span::point(tu, 0) }, diagnostics: Vec::new() };
        lexer.current = lexer.scan();
        lexer
    }

    /// Returns the current token without consuming it.
    pub fn peek(&self) -> Token {
        self.current
    }

    /// Consumes the current token and scans the next one, returning the
    /// token that was current before this call.
    pub fn advance(&mut self) -> Token {
        let tok = self.current;
        if tok.kind != TokenKind::Eof {
            self.current = self.scan();
        }
        tok
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn scan(&mut self) -> Token {
        while let Some(b) = self.peek_byte() {
            if !is_whitespace(b) {
                break;
            }
            self.pos += 1;
        }

        let start = self.pos;
        let Some(b) = self.peek_byte() else {
            return Token { kind: TokenKind::Eof, span: Span::point(self.tu, start) };
        };

        match b {
            b';' => {
                while let Some(b) = self.peek_byte() {
                    if b == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
                Token { kind: TokenKind::Comment, span: Span::new(self.tu, start, self.pos - start) }
            }
            b'(' => {
                self.pos += 1;
                Token { kind: TokenKind::LParen, span: Span::new(self.tu, start, 1) }
            }
            b')' => {
                self.pos += 1;
                Token { kind: TokenKind::RParen, span: Span::new(self.tu, start, 1) }
            }
            b'\'' => {
                self.pos += 1;
                Token { kind: TokenKind::Quote, span: Span::new(self.tu, start, 1) }
            }
            b if is_symbol_byte(b) => self.scan_symbol_class(start),
            _ => {
                self.pos += 1;
                let span = Span::new(self.tu, start, self.pos - start);
                self.diagnostics.push(Diagnostic::new(span, DiagnosticKind::Lex, format!("unexpected byte {b:#04x}")));
                Token { kind: TokenKind::Unexpected, span }
            }
        }
    }

    /// Scans a run of symbol-class bytes and classifies it per spec
    /// §4C / SPEC_FULL.md §E.1 (no fallthrough between the number/dot/
    /// symbol cases: classify the *whole* run once, not byte by byte).
    fn scan_symbol_class(&mut self, start: usize) -> Token {
        while let Some(b) = self.peek_byte() {
            if !is_symbol_byte(b) {
                break;
            }
            self.pos += 1;
        }
        let span = Span::new(self.tu, start, self.pos - start);
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).expect("source is valid utf-8");

        if let Some(n) = parse_decimal_integer(text) {
            return match n {
                Ok(value) => Token { kind: TokenKind::Number(value), span },
                Err(()) => {
                    self.diagnostics.push(Diagnostic::new(span, DiagnosticKind::Lex, "integer is too big"));
                    Token { kind: TokenKind::Number(0.0), span }
                }
            };
        }

        if text.bytes().all(|b| b == b'.') {
            if text.len() == 1 {
                return Token { kind: TokenKind::Dot, span };
            }
            self.diagnostics.push(Diagnostic::new(span, DiagnosticKind::Lex, "symbol composed entirely of dots"));
            return Token { kind: TokenKind::Dot, span };
        }

        Token { kind: TokenKind::Symbol, span }
    }
}

/// `Some(Ok(n))` if `text` is a base-10 integer with an optional leading
/// sign; `Some(Err(()))` if it looks like one but overflows; `None` if
/// it isn't shaped like a number at all (so the caller falls through to
/// dot/symbol classification).
fn parse_decimal_integer(text: &str) -> Option<Result<f64, ()>> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match text.parse::<i64>() {
        Ok(n) => Some(Ok(n as f64)),
        Err(_) => Some(Err(())),
    }
}

/// Scans the entire buffer up front, for callers (the reader) that want
/// plain lookahead rather than the peek/advance cursor directly.
pub fn lex(source: &str, tu: TranslationUnitId) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source, tu);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.advance();
        let is_eof = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if is_eof {
            break;
        }
    }
    (tokens, lexer.diagnostics)
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src, TranslationUnitId(0)).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn parens_and_atoms() {
        assert_eq!(
            kinds("(foo 1 -2 . 'bar)"),
            vec![
                TokenKind::LParen,
                TokenKind::Symbol,
                TokenKind::Number(1.0),
                TokenKind::Number(-2.0),
                TokenKind::Dot,
                TokenKind::Quote,
                TokenKind::Symbol,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comment_to_end_of_line() {
        assert_eq!(
            kinds("1 ; ignored\n2"),
            vec![TokenKind::Number(1.0), TokenKind::Comment, TokenKind::Number(2.0), TokenKind::Eof]
        );
    }

    #[test]
    fn dotted_run_longer_than_one_is_an_error_dot() {
        let (tokens, diags) = lex("..", TranslationUnitId(0));
        assert_eq!(tokens[0].kind, TokenKind::Dot);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn borderline_decimal_like_token_is_a_symbol_not_a_number() {
        // `1.2` is not an all-digit run: per SPEC_FULL.md §E.1 it's a
        // plain symbol, not a number with a truncated fractional part.
        assert_eq!(kinds("1.2"), vec![TokenKind::Symbol, TokenKind::Eof]);
    }

    #[test]
    fn overflowing_integer_yields_zero_and_a_diagnostic() {
        let (tokens, diags) = lex("99999999999999999999", TranslationUnitId(0));
        assert_eq!(tokens[0].kind, TokenKind::Number(0.0));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn eof_keeps_yielding_eof() {
        let mut lexer = Lexer::new("", TranslationUnitId(0));
        assert_eq!(lexer.advance().kind, TokenKind::Eof);
        assert_eq!(lexer.advance().kind, TokenKind::Eof);
        assert_eq!(lexer.peek().kind, TokenKind::Eof);
    }
}
