//! System-layer error types.
//!
//! Every variant is a configuration-time error: the caller declared a system
//! or accessed a control in a way that can never succeed. Conditions that
//! depend on data (no matching systems, an optional column that did not
//! bind) are not errors.

use engine_component::{Entity, StoreError};
use engine_signature::SignatureError;

use crate::kind::SystemKind;

/// Errors raised by system registration and the system controls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SystemError {
    /// A signature names an unknown component.
    #[error("unknown component '{0}' in signature")]
    InvalidComponentId(String),

    /// A signature combines operators and sources in an unsupported way.
    #[error("invalid component expression: {0}")]
    InvalidComponentExpression(String),

    /// The signature cannot be registered under the requested kind.
    #[error("signature '{signature}' cannot be registered as {kind:?}")]
    InvalidParameters {
        /// The requested kind.
        kind: SystemKind,
        /// The signature text.
        signature: String,
    },

    /// `get_context` was called before any `set_context`.
    #[error("system {0} has no context")]
    MissingSystemContext(Entity),

    /// The entity is neither a system nor a family of systems.
    #[error("{0} is not a system")]
    NotASystem(Entity),

    /// The system only runs in response to entity lifecycle events.
    #[error("system {0} cannot be run on demand")]
    NotRunnable(Entity),

    /// The name is bound to an entity that is not a system.
    #[error("name '{0}' is already taken")]
    NameTaken(String),

    /// The storage layer rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SignatureError> for SystemError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::InvalidComponentId(name) => SystemError::InvalidComponentId(name),
            SignatureError::InvalidComponentExpression(reason) => {
                SystemError::InvalidComponentExpression(reason)
            }
            parse @ SignatureError::Parse { .. } => {
                SystemError::InvalidComponentExpression(parse.to_string())
            }
        }
    }
}
