//! Signature error types.

/// Errors raised while parsing or compiling a signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The expression is not well-formed.
    #[error("column {col}: {message}")]
    Parse {
        /// 1-based column of the offending character or token.
        col: usize,
        /// What went wrong.
        message: String,
    },

    /// A clause names something that is not a known component.
    #[error("unknown component '{0}'")]
    InvalidComponentId(String),

    /// Operators and sources are combined in an unsupported way.
    #[error("invalid component expression: {0}")]
    InvalidComponentExpression(String),
}
