//! Error types.
//!
//! Only *configuration* errors are represented here — unknown built-ins,
//! missing gradient rules, malformed rewrite-rule patterns. Capacity
//! conditions (saturation hit the iteration/class-size ceiling) are not
//! errors at all; they are reported through [`crate::egraph::SaturationStats`].
//! Arithmetic "errors" (division by a literal zero, `sqrt` of a negative
//! literal) are not raised either — constant folding simply produces the
//! IEEE-754 result and compilation continues.
//!
//! Hand-rolls `Display`/`Error` rather than reaching for `thiserror`.

use std::fmt;

/// A fatal configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompileError {
    /// A `call` node referenced a name absent from the built-in registry.
    UnknownBuiltin {
        /// The offending call name.
        name: String,
    },
    /// A built-in is registered for evaluation but has no gradient rule.
    MissingGradientRule {
        /// The built-in's name.
        name: String,
    },
    /// A built-in was called with the wrong number of arguments.
    ArityMismatch {
        /// The built-in's name.
        name: String,
        /// The accepted argument count range, formatted for display.
        expected: String,
        /// The number of arguments actually supplied.
        got: usize,
    },
    /// A rewrite rule's RHS pattern referenced a variable absent from its LHS.
    UnboundPatternVariable {
        /// The offending rule's name.
        rule: String,
        /// The unbound pattern-variable name.
        var: String,
    },
    /// `parsePattern` rejected its input.
    InvalidPattern {
        /// The offending token.
        token: String,
        /// A human-readable description of what was expected.
        msg: String,
    },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnknownBuiltin { name } => {
                write!(f, "unknown built-in function '{name}'")
            }
            CompileError::MissingGradientRule { name } => {
                write!(f, "built-in '{name}' has no registered gradient rule")
            }
            CompileError::ArityMismatch {
                name,
                expected,
                got,
            } => {
                write!(
                    f,
                    "'{name}' expects {expected} argument(s), but got {got}"
                )
            }
            CompileError::UnboundPatternVariable { rule, var } => {
                write!(
                    f,
                    "rule '{rule}': pattern variable '?{var}' appears in the right-hand \
                     side but not the left-hand side"
                )
            }
            CompileError::InvalidPattern { token, msg } => {
                write!(f, "invalid pattern at '{token}': {msg}")
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// Convenience alias for fallible compiler operations.
pub type Result<T> = std::result::Result<T, CompileError>;
