//! Recursive-descent / Pratt parser for Lumen.
//!
//! The parser consumes the token stream produced by the lexer and builds
//! nodes directly into an [`Ast`]. Expressions use binding-power dispatch
//! (see [`expressions`]); statements are parsed by a keyword switch after an
//! optional visibility modifier; types share the expression module's
//! prefix-driven style.
//!
//! # Error recovery
//!
//! A syntactic failure inside a statement records a structured diagnostic
//! (with the reconstructed source line) and abandons that statement; the
//! outer loop resynchronises at the next statement boundary and keeps
//! going, so one bad statement yields one diagnostic rather than a cascade.

pub(crate) mod expressions;
pub(crate) mod statements;
pub(crate) mod types;

use lumen_common::diagnostics::{Diagnostic, DiagnosticSink};
use lumen_common::span::{LineIndex, Span};
use lumen_common::token::{Token, TokenKind};

use crate::ast::{Ast, StmtId, StmtKind};

pub(crate) struct Parser<'a, 'src> {
    tokens: &'a [Token],
    pos: usize,
    source: &'src str,
    path: &'a str,
    pub(crate) ast: Ast,
    sink: &'a mut DiagnosticSink,
    line_index: LineIndex,
}

impl<'a, 'src> Parser<'a, 'src> {
    pub(crate) fn new(
        tokens: &'a [Token],
        source: &'src str,
        path: &'a str,
        sink: &'a mut DiagnosticSink,
    ) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
            path,
            ast: Ast::with_capacity(source.len()),
            sink,
            line_index: LineIndex::new(source),
        }
    }

    // ── Lookahead ──────────────────────────────────────────────────────

    /// Whether unconsumed tokens remain before end-of-input.
    pub(crate) fn has_tokens(&self) -> bool {
        self.current().kind != TokenKind::Eof
    }

    /// The current token. Past the end of the stream this is a synthetic
    /// end-of-input token.
    pub(crate) fn current(&self) -> Token {
        self.peek(0)
    }

    /// The token `n` positions ahead.
    pub(crate) fn peek(&self, n: usize) -> Token {
        match self.tokens.get(self.pos + n) {
            Some(tok) => *tok,
            None => self.eof_token(),
        }
    }

    /// Check the current token's kind.
    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn eof_token(&self) -> Token {
        let end = self.source.len() as u32;
        let (line, col) = self.line_index.line_col(end.saturating_sub(1));
        Token::new(TokenKind::Eof, Span::new(end, end), line, col, 0)
    }

    // ── Consumption ────────────────────────────────────────────────────

    /// Consume and return the current token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Consume the current token if it matches `kind`.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of the given kind, or record a diagnostic and return
    /// the end-of-input token without advancing.
    pub(crate) fn consume(&mut self, kind: TokenKind, message: &str) -> Token {
        if self.at(kind) {
            self.advance()
        } else {
            let at = self.current();
            self.syntax_error(message.to_string(), at);
            self.eof_token()
        }
    }

    /// Consume an identifier and copy its text, or record a diagnostic.
    pub(crate) fn expect_name(&mut self, message: &str) -> Option<String> {
        if self.at(TokenKind::Ident) {
            let token = self.advance();
            Some(token.text(self.source).to_string())
        } else {
            let at = self.current();
            self.syntax_error(message.to_string(), at);
            None
        }
    }

    /// The span of the most recently consumed token.
    pub(crate) fn prev_span(&self) -> Span {
        if self.pos == 0 {
            Span::new(0, 0)
        } else {
            self.tokens[self.pos - 1].span
        }
    }

    /// The text of a token.
    pub(crate) fn text(&self, token: Token) -> &'src str {
        token.text(self.source)
    }

    // ── Diagnostics ────────────────────────────────────────────────────

    /// Record a syntactic diagnostic anchored at `token`, reconstructing
    /// the offending source line from the buffer.
    pub(crate) fn syntax_error(&mut self, message: String, token: Token) {
        let line_text = self
            .line_index
            .line_text(self.source, token.line)
            .unwrap_or("")
            .to_string();
        self.sink.emit(Diagnostic::new(
            "Syntax Error",
            self.path,
            message,
            token.line,
            token.col,
            line_text,
            token.span.len().max(1),
        ));
    }

    // ── Program ────────────────────────────────────────────────────────

    /// Parse the whole token stream into a program node.
    ///
    /// Returns `None` only when the stream held statements and every one of
    /// them failed to parse.
    pub(crate) fn parse_program(&mut self) -> Option<StmtId> {
        let start = self.current().span;
        let mut items = Vec::new();
        let mut saw_item = false;
        while self.has_tokens() {
            saw_item = true;
            let before = self.pos;
            match self.parse_top_level() {
                Some(id) => items.push(id),
                None => self.synchronize(before),
            }
        }
        if items.is_empty() && saw_item {
            return None;
        }
        let span = start.merge(self.prev_span());
        let range = self.ast.alloc_stmt_list(items);
        Some(self.ast.new_stmt(StmtKind::Program { items: range }, span))
    }

    /// A top-level item: a preprocessor directive or an ordinary statement.
    pub(crate) fn parse_top_level(&mut self) -> Option<StmtId> {
        match self.current().kind {
            TokenKind::AtModule => self.parse_module_directive(),
            TokenKind::AtUse => self.parse_use_directive(),
            _ => self.parse_statement(),
        }
    }

    /// Skip forward to a plausible statement boundary after a parse failure,
    /// always making progress.
    pub(crate) fn synchronize(&mut self, before: usize) {
        if self.pos == before && self.has_tokens() {
            self.advance();
        }
        while self.has_tokens() {
            if self.eat(TokenKind::Semicolon) {
                return;
            }
            match self.current().kind {
                TokenKind::RBrace
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::Fn
                | TokenKind::Struct
                | TokenKind::Enum
                | TokenKind::If
                | TokenKind::Loop
                | TokenKind::Return
                | TokenKind::Output
                | TokenKind::Outputln
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Defer
                | TokenKind::AtModule
                | TokenKind::AtUse => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Directives ─────────────────────────────────────────────────────

    /// `@module name { ...top-level items... }`
    fn parse_module_directive(&mut self) -> Option<StmtId> {
        let at = self.advance(); // @module
        let name = self.expect_name("Expected module name after '@module'")?;
        self.consume(TokenKind::LBrace, "Expected '{' to open module body");
        let mut items = Vec::new();
        while self.has_tokens() && !self.at(TokenKind::RBrace) {
            let before = self.pos;
            match self.parse_top_level() {
                Some(id) => items.push(id),
                None => self.synchronize(before),
            }
        }
        self.consume(TokenKind::RBrace, "Expected '}' to close module body");
        let span = at.span.merge(self.prev_span());
        let body = self.ast.alloc_stmt_list(items);
        Some(self.ast.new_stmt(StmtKind::Module { name, body }, span))
    }

    /// `@use name [as alias];`
    fn parse_use_directive(&mut self) -> Option<StmtId> {
        let at = self.advance(); // @use
        let module = self.expect_name("Expected module name after '@use'")?;
        let alias = if self.eat(TokenKind::As) {
            Some(self.expect_name("Expected alias name after 'as'")?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after '@use' directive");
        let span = at.span.merge(self.prev_span());
        Some(self.ast.new_stmt(StmtKind::Use { module, alias }, span))
    }
}
