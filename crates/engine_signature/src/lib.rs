//! # engine_signature
//!
//! Turns a textual system signature such as `"Position, !Frozen, ?Velocity"`
//! into the ordered column plan a system executes against.
//!
//! - [`lexer`] and [`parser`] produce an [`ast::Expr`].
//! - [`compiler::compile`] resolves names through a
//!   [`FamilyAlgebra`](engine_component::FamilyAlgebra) and builds the
//!   [`Signature`] with its derived families.

pub mod ast;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{Clause, ClauseOp, Expr, SourceKind};
pub use compiler::{ColumnDescriptor, ColumnOp, Signature, compile};
pub use error::SignatureError;
pub use parser::Parser;
