//! Statement parsing: keyword dispatch, declarations, control flow, and the
//! three loop shapes.

use lumen_common::token::TokenKind;

use crate::ast::{ElifArm, Field, Param, StmtId, StmtKind, Visibility};

use super::Parser;

impl Parser<'_, '_> {
    /// Parse one statement. At the head, an optional visibility modifier
    /// (`pub` / `priv`) is consumed; it applies to declarations and is
    /// ignored elsewhere.
    pub(crate) fn parse_statement(&mut self) -> Option<StmtId> {
        let vis = if self.eat(TokenKind::Pub) {
            Visibility::Public
        } else if self.eat(TokenKind::Priv) {
            Visibility::Private
        } else {
            Visibility::Default
        };

        match self.current().kind {
            TokenKind::Let => self.parse_var_decl(true, vis),
            TokenKind::Const => self.parse_var_decl(false, vis),
            TokenKind::Fn => self.parse_fn_decl(vis),
            TokenKind::Struct => self.parse_struct_decl(vis),
            TokenKind::Enum => self.parse_enum_decl(vis),
            TokenKind::Return => self.parse_return(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::If => self.parse_if(),
            TokenKind::Loop => self.parse_loop(),
            TokenKind::Output => self.parse_print(false),
            TokenKind::Outputln => self.parse_print(true),
            TokenKind::Break => {
                let token = self.advance();
                self.consume(TokenKind::Semicolon, "Expected ';' after 'break'");
                let span = token.span.merge(self.prev_span());
                Some(self.ast.new_stmt(StmtKind::Break, span))
            }
            TokenKind::Continue => {
                let token = self.advance();
                self.consume(TokenKind::Semicolon, "Expected ';' after 'continue'");
                let span = token.span.merge(self.prev_span());
                Some(self.ast.new_stmt(StmtKind::Continue, span))
            }
            TokenKind::Defer => self.parse_defer(),
            _ => self.parse_expr_statement(),
        }
    }

    /// `let name [Type] [= init];` / `const name [Type] [= init];`
    fn parse_var_decl(&mut self, mutable: bool, vis: Visibility) -> Option<StmtId> {
        let kw = self.advance(); // let / const
        let name = self.expect_name("Expected variable name")?;
        let annotation = if !self.at(TokenKind::Eq) && !self.at(TokenKind::Semicolon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let init = if self.eat(TokenKind::Eq) {
            Some(self.parse_expr_lowest()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after variable declaration");
        let span = kw.span.merge(self.prev_span());
        Some(self.ast.new_stmt(
            StmtKind::VarDecl {
                name,
                mutable,
                vis,
                annotation,
                init,
            },
            span,
        ))
    }

    /// `fn name(a TypeA, b TypeB) RetType { body }`
    fn parse_fn_decl(&mut self, vis: Visibility) -> Option<StmtId> {
        let kw = self.advance(); // fn
        let name = self.expect_name("Expected function name after 'fn'")?;
        self.consume(TokenKind::LParen, "Expected '(' after function name");
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) && self.has_tokens() {
            let param_start = self.current().span;
            let param_name = self.expect_name("Expected parameter name")?;
            let ty = self.parse_type()?;
            params.push(Param {
                name: param_name,
                ty,
                span: param_start.merge(self.prev_span()),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RParen, "Expected ')' after parameter list");
        let return_type = self.parse_type()?;
        if !self.at(TokenKind::LBrace) {
            let at = self.current();
            self.syntax_error("Expected '{' to open function body".to_string(), at);
            return None;
        }
        let body = self.parse_block()?;
        let span = kw.span.merge(self.prev_span());
        let params = self.ast.alloc_params(params);
        Some(self.ast.new_stmt(
            StmtKind::FnDecl {
                name,
                params,
                return_type,
                vis,
                body,
            },
            span,
        ))
    }

    /// `struct Name { [pub|priv] field Type; ... }`
    ///
    /// Fields default to private; the two visibility groups are stored as
    /// separate lists on the declaration.
    fn parse_struct_decl(&mut self, vis: Visibility) -> Option<StmtId> {
        let kw = self.advance(); // struct
        let name = self.expect_name("Expected struct name after 'struct'")?;
        self.consume(TokenKind::LBrace, "Expected '{' to open struct body");
        let mut public_fields = Vec::new();
        let mut private_fields = Vec::new();
        while !self.at(TokenKind::RBrace) && self.has_tokens() {
            let field_public = if self.eat(TokenKind::Pub) {
                true
            } else {
                self.eat(TokenKind::Priv);
                false
            };
            let field_start = self.current().span;
            let field_name = self.expect_name("Expected field name")?;
            let ty = self.parse_type()?;
            self.consume(TokenKind::Semicolon, "Expected ';' after struct field");
            let field = Field {
                name: field_name,
                ty,
                span: field_start.merge(self.prev_span()),
            };
            if field_public {
                public_fields.push(field);
            } else {
                private_fields.push(field);
            }
        }
        self.consume(TokenKind::RBrace, "Expected '}' to close struct body");
        let span = kw.span.merge(self.prev_span());
        let public_fields = self.ast.alloc_fields(public_fields);
        let private_fields = self.ast.alloc_fields(private_fields);
        Some(self.ast.new_stmt(
            StmtKind::StructDecl {
                name,
                vis,
                public_fields,
                private_fields,
            },
            span,
        ))
    }

    /// `enum Name { A, B, C }`
    fn parse_enum_decl(&mut self, vis: Visibility) -> Option<StmtId> {
        let kw = self.advance(); // enum
        let name = self.expect_name("Expected enum name after 'enum'")?;
        self.consume(TokenKind::LBrace, "Expected '{' to open enum body");
        let mut members = Vec::new();
        while !self.at(TokenKind::RBrace) && self.has_tokens() {
            members.push(self.expect_name("Expected enum member name")?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RBrace, "Expected '}' to close enum body");
        let span = kw.span.merge(self.prev_span());
        Some(self.ast.new_stmt(StmtKind::EnumDecl { name, vis, members }, span))
    }

    /// `return [value];`
    fn parse_return(&mut self) -> Option<StmtId> {
        let kw = self.advance(); // return
        let value = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr_lowest()?)
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after return statement");
        let span = kw.span.merge(self.prev_span());
        Some(self.ast.new_stmt(StmtKind::Return { value }, span))
    }

    /// `{ statements }` with per-statement recovery.
    pub(crate) fn parse_block(&mut self) -> Option<StmtId> {
        let open = self.consume(TokenKind::LBrace, "Expected '{'");
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) && self.has_tokens() {
            let before = self.pos;
            match self.parse_statement() {
                Some(id) => stmts.push(id),
                None => self.synchronize(before),
            }
        }
        self.consume(TokenKind::RBrace, "Expected '}' to close block");
        let span = open.span.merge(self.prev_span());
        let stmts = self.ast.alloc_stmt_list(stmts);
        Some(self.ast.new_stmt(StmtKind::Block { stmts }, span))
    }

    /// `if cond branch [elif cond branch]* [else branch]`
    fn parse_if(&mut self) -> Option<StmtId> {
        let kw = self.advance(); // if
        let cond = self.parse_expr_lowest()?;
        let then_branch = self.parse_statement()?;
        let mut elifs = Vec::new();
        while self.at(TokenKind::Elif) {
            self.advance();
            let elif_cond = self.parse_expr_lowest()?;
            let body = self.parse_statement()?;
            elifs.push(ElifArm { cond: elif_cond, body });
        }
        let else_branch = if self.eat(TokenKind::Else) {
            Some(self.parse_statement()?)
        } else {
            None
        };
        let span = kw.span.merge(self.prev_span());
        let elifs = self.ast.alloc_elifs(elifs);
        Some(self.ast.new_stmt(
            StmtKind::If {
                cond,
                then_branch,
                elifs,
                else_branch,
            },
            span,
        ))
    }

    /// The single `loop` keyword covers three shapes, distinguished by what
    /// follows it:
    ///
    /// - `loop { ... }` -- infinite;
    /// - `loop (cond) [: incr] { ... }` -- while-like;
    /// - `loop [init;*] (cond) [: incr] { ... }` -- for-like.
    fn parse_loop(&mut self) -> Option<StmtId> {
        let kw = self.advance(); // loop

        let mut init = Vec::new();
        if self.eat(TokenKind::LBracket) {
            while !self.at(TokenKind::RBracket) && self.has_tokens() {
                init.push(self.parse_statement()?);
            }
            self.consume(TokenKind::RBracket, "Expected ']' after loop initialisers");
        }

        let cond = if self.at(TokenKind::LBrace) {
            if !init.is_empty() {
                let at = self.current();
                self.syntax_error(
                    "Loop with initialisers requires a condition in '(...)'".to_string(),
                    at,
                );
                return None;
            }
            None
        } else {
            self.consume(TokenKind::LParen, "Expected '(' before loop condition");
            let cond = self.parse_expr_lowest()?;
            self.consume(TokenKind::RParen, "Expected ')' after loop condition");
            Some(cond)
        };

        let incr = if self.eat(TokenKind::Colon) {
            Some(self.parse_expr_lowest()?)
        } else {
            None
        };

        if !self.at(TokenKind::LBrace) {
            let at = self.current();
            self.syntax_error("Expected '{' to open loop body".to_string(), at);
            return None;
        }
        let body = self.parse_block()?;
        let span = kw.span.merge(self.prev_span());
        let init = self.ast.alloc_stmt_list(init);
        Some(self.ast.new_stmt(StmtKind::Loop { init, cond, incr, body }, span))
    }

    /// `output(args);` / `outputln(args);`
    fn parse_print(&mut self, newline: bool) -> Option<StmtId> {
        let kw = self.advance(); // output / outputln
        self.consume(TokenKind::LParen, "Expected '(' after print statement");
        let mut args = Vec::new();
        while !self.at(TokenKind::RParen) && self.has_tokens() {
            args.push(self.parse_expr_lowest()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RParen, "Expected ')' after print arguments");
        self.consume(TokenKind::Semicolon, "Expected ';' after print statement");
        let span = kw.span.merge(self.prev_span());
        let args = self.ast.alloc_expr_list(args);
        Some(self.ast.new_stmt(StmtKind::Print { args, newline }, span))
    }

    /// `defer statement`
    fn parse_defer(&mut self) -> Option<StmtId> {
        let kw = self.advance(); // defer
        let stmt = self.parse_statement()?;
        let span = kw.span.merge(self.prev_span());
        Some(self.ast.new_stmt(StmtKind::Defer { stmt }, span))
    }

    /// An expression evaluated for effect, terminated by `;`.
    fn parse_expr_statement(&mut self) -> Option<StmtId> {
        let expr = self.parse_expr_lowest()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after expression");
        let span = self.ast.expr(expr).span.merge(self.prev_span());
        Some(self.ast.new_stmt(StmtKind::ExprStmt(expr), span))
    }
}
