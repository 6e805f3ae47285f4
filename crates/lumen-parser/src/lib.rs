// Lumen parser -- AST model and Pratt parser for the Lumen language.

pub mod ast;
mod parser;

pub use parser::expressions::{binding_power, BindingPower};

use lumen_common::diagnostics::DiagnosticSink;
use lumen_common::token::Token;

use ast::{Ast, StmtId};

/// The outcome of a parse: the node arena plus the program root.
///
/// `root` is `None` only when the source contained statements and every one
/// of them failed to parse; partial failures still yield a root, with the
/// failures recorded in the sink.
pub struct ParseResult {
    pub ast: Ast,
    pub root: Option<StmtId>,
}

/// Parse a pre-lexed token stream.
///
/// This is the pipeline entry point: the driver lexes into a token vector,
/// gates on the sink, then hands the tokens here.
pub fn parse_tokens(
    tokens: &[Token],
    source: &str,
    path: &str,
    sink: &mut DiagnosticSink,
) -> ParseResult {
    let mut parser = parser::Parser::new(tokens, source, path, sink);
    let root = parser.parse_program();
    ParseResult {
        ast: parser.ast,
        root,
    }
}

/// Convenience: lex and parse in one step.
pub fn parse(source: &str, path: &str, sink: &mut DiagnosticSink) -> ParseResult {
    let tokens = lumen_lexer::Lexer::tokenize(source, path, sink);
    parse_tokens(&tokens, source, path, sink)
}
