// Lumen lexer -- tokenizer for the Lumen programming language.

mod cursor;

use cursor::Cursor;
use lumen_common::diagnostics::{Diagnostic, DiagnosticSink};
use lumen_common::span::{LineIndex, Span};
use lumen_common::token::{
    directive_from_str, keyword_from_str, one_char_symbol, two_char_symbol, Token, TokenKind,
};

/// The Lumen lexer. Converts source text into a stream of tokens.
///
/// Wraps a [`Cursor`] for byte-level iteration and implements
/// `Iterator<Item = Token>` so callers can consume tokens lazily or collect
/// them into a `Vec`. Lexical errors (unknown characters, unknown
/// directives, unterminated strings) are recorded in the diagnostic sink
/// and surface as `Error` tokens so the parser can keep going.
///
/// Comments (`::` to end of line, `/* ... */`) are skipped as whitespace.
/// Each token's `ws_len` is the number of bytes between the end of the
/// previous token's span and the start of this one, so whitespace, comment,
/// and delimiter bytes are fully accounted for across the stream.
pub struct Lexer<'a, 'src> {
    cursor: Cursor<'src>,
    source: &'src str,
    path: &'a str,
    sink: &'a mut DiagnosticSink,
    line_index: LineIndex,
    /// End offset of the previous token's span (for `ws_len`).
    prev_end: u32,
    /// Whether we have already emitted the `Eof` token.
    emitted_eof: bool,
}

impl<'a, 'src> Lexer<'a, 'src> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str, path: &'a str, sink: &'a mut DiagnosticSink) -> Self {
        Self {
            cursor: Cursor::new(source),
            source,
            path,
            sink,
            line_index: LineIndex::new(source),
            prev_end: 0,
            emitted_eof: false,
        }
    }

    /// Convenience: tokenize the entire source into a `Vec<Token>`.
    ///
    /// The returned vector includes the final `Eof` token.
    pub fn tokenize(source: &'src str, path: &'a str, sink: &'a mut DiagnosticSink) -> Vec<Token> {
        Lexer::new(source, path, sink).collect()
    }

    /// Produce the next token.
    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.cursor.pos();
        let line = self.cursor.line();
        let col = self.cursor.col();

        let Some(c) = self.cursor.peek() else {
            return self.finish(TokenKind::Eof, start, line, col);
        };

        match c {
            '@' => self.lex_directive(start, line, col),
            '"' => self.lex_string(start, line, col),
            '0'..='9' => self.lex_number(start, line, col),
            c if is_ident_start(c) => self.lex_ident(start, line, col),
            _ => self.lex_symbol(start, line, col),
        }
    }

    // ── Helpers ────────────────────────────────────────────────────────

    /// Assemble a token whose span ends at the current cursor position.
    fn finish(&mut self, kind: TokenKind, start: u32, line: u32, col: u32) -> Token {
        let span = Span::new(start, self.cursor.pos());
        let ws_len = start - self.prev_end;
        self.prev_end = span.end;
        Token::new(kind, span, line, col, ws_len)
    }

    /// Record a lexical diagnostic at the given position.
    fn error(&mut self, message: String, line: u32, col: u32, span_len: u32) {
        let line_text = self
            .line_index
            .line_text(self.source, line)
            .unwrap_or("")
            .to_string();
        self.sink.emit(Diagnostic::new(
            "Lexical Error",
            self.path,
            message,
            line,
            col,
            line_text,
            span_len,
        ));
    }

    /// Skip spaces, tabs, newlines, `::` line comments, and `/* ... */`
    /// block comments. An unterminated block comment consumes to end of
    /// input.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.cursor.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.cursor.advance();
                }
                Some(':') if self.cursor.peek_next() == Some(':') => {
                    self.cursor.eat_while(|c| c != '\n');
                }
                Some('/') if self.cursor.peek_next() == Some('*') => {
                    self.cursor.advance(); // /
                    self.cursor.advance(); // *
                    loop {
                        match self.cursor.peek() {
                            None => break,
                            Some('*') if self.cursor.peek_next() == Some('/') => {
                                self.cursor.advance();
                                self.cursor.advance();
                                break;
                            }
                            _ => {
                                self.cursor.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    // ── Token scanners ─────────────────────────────────────────────────

    /// `@` followed by identifier characters: preprocessor directive.
    fn lex_directive(&mut self, start: u32, line: u32, col: u32) -> Token {
        self.cursor.advance(); // @
        let name_start = self.cursor.pos();
        self.cursor.eat_while(is_ident_continue);
        let name = self.cursor.slice(name_start, self.cursor.pos());
        match directive_from_str(name) {
            Some(kind) => self.finish(kind, start, line, col),
            None => {
                let len = self.cursor.pos() - start;
                self.error(format!("Unknown directive '@{name}'"), line, col, len);
                self.finish(TokenKind::Error, start, line, col)
            }
        }
    }

    /// Identifier or keyword.
    fn lex_ident(&mut self, start: u32, line: u32, col: u32) -> Token {
        self.cursor.eat_while(is_ident_continue);
        let text = self.cursor.slice(start, self.cursor.pos());
        let kind = keyword_from_str(text).unwrap_or(TokenKind::Ident);
        self.finish(kind, start, line, col)
    }

    /// Decimal integer or float literal. A float requires a digit on both
    /// sides of the dot, so `1.` stays an integer followed by `.`.
    fn lex_number(&mut self, start: u32, line: u32, col: u32) -> Token {
        self.cursor.eat_while(|c| c.is_ascii_digit());
        if self.cursor.peek() == Some('.')
            && self.cursor.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            self.cursor.advance(); // .
            self.cursor.eat_while(|c| c.is_ascii_digit());
            self.finish(TokenKind::FloatLiteral, start, line, col)
        } else {
            self.finish(TokenKind::IntLiteral, start, line, col)
        }
    }

    /// String literal. The emitted span covers the interior only; the
    /// closing quote is accounted to the next token's `ws_len`.
    fn lex_string(&mut self, start: u32, line: u32, col: u32) -> Token {
        self.cursor.advance(); // opening "
        let interior_start = self.cursor.pos();
        self.cursor.eat_while(|c| c != '"');
        let interior_end = self.cursor.pos();
        if self.cursor.peek() == Some('"') {
            self.cursor.advance(); // closing "
            let ws_len = interior_start - self.prev_end;
            self.prev_end = interior_end;
            Token::new(
                TokenKind::StringLiteral,
                Span::new(interior_start, interior_end),
                line,
                col,
                ws_len,
            )
        } else {
            let len = self.cursor.pos() - start;
            self.error("Unterminated string literal".to_string(), line, col, len);
            self.finish(TokenKind::Error, start, line, col)
        }
    }

    /// Two-character symbol lookup, then one-character, then the unknown
    /// token diagnostic.
    fn lex_symbol(&mut self, start: u32, line: u32, col: u32) -> Token {
        let a = self.cursor.peek().expect("caller checked non-eof");
        if let Some(b) = self.cursor.peek_next() {
            if let Some(kind) = two_char_symbol(a, b) {
                self.cursor.advance();
                self.cursor.advance();
                return self.finish(kind, start, line, col);
            }
        }
        if let Some(kind) = one_char_symbol(a) {
            self.cursor.advance();
            return self.finish(kind, start, line, col);
        }
        self.cursor.advance();
        self.error(format!("Token not found: '{a}'"), line, col, a.len_utf8() as u32);
        self.finish(TokenKind::Error, start, line, col)
    }
}

impl Iterator for Lexer<'_, '_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.emitted_eof {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.emitted_eof = true;
        }
        Some(token)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
