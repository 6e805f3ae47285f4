use std::fmt;

use inkwell::builder::BuilderError;

/// A lowering failure. These abort the codegen stage; the driver reports
/// them and exits non-zero.
#[derive(Debug)]
pub enum CodegenError {
    /// An LLVM builder call failed.
    Builder(String),
    /// Module verification failed after lowering.
    Verify { module: String, message: String },
    /// Target machine setup failed.
    Target(String),
    /// Object or IR file emission failed.
    Emit(String),
    /// A name could not be resolved in the symbol tables.
    MissingSymbol(String),
    /// A construct the lowering does not support.
    Unsupported(String),
    /// The AST handed to lowering was not in the shape the type checker
    /// guarantees.
    InvalidProgram(String),
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builder(msg) => write!(f, "IR builder error: {msg}"),
            Self::Verify { module, message } => {
                write!(f, "module '{module}' failed verification: {message}")
            }
            Self::Target(msg) => write!(f, "target setup failed: {msg}"),
            Self::Emit(msg) => write!(f, "object emission failed: {msg}"),
            Self::MissingSymbol(name) => write!(f, "unresolved symbol '{name}'"),
            Self::Unsupported(what) => write!(f, "unsupported construct: {what}"),
            Self::InvalidProgram(msg) => write!(f, "invalid program: {msg}"),
        }
    }
}

impl std::error::Error for CodegenError {}

impl From<BuilderError> for CodegenError {
    fn from(err: BuilderError) -> Self {
        CodegenError::Builder(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_informative() {
        let err = CodegenError::Verify {
            module: "main".to_string(),
            message: "bad terminator".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "module 'main' failed verification: bad terminator"
        );
        assert_eq!(
            CodegenError::MissingSymbol("f".to_string()).to_string(),
            "unresolved symbol 'f'"
        );
    }
}
