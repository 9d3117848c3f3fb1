/// Abstract syntax tree types for signature expressions.
use serde::{Deserialize, Serialize};

/// Where a column's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// A component owned by the matched entity (`ENTITY.`, the default).
    FromEntity,
    /// A component owned by the system entity itself (`SYSTEM.`).
    FromSystem,
    /// A bare identifier that never binds data (`ID.`).
    FromId,
}

/// Operator applied to one clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClauseOp {
    And,
    /// Introduced by `||`; extends the previous column.
    Or,
    /// `!`
    Not,
    /// `?`
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub op: ClauseOp,
    pub source: SourceKind,
    pub name: String,
    /// 1-based column of the clause's identifier.
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// The literal `0`: the system matches nothing.
    Nothing,
    Clauses(Vec<Clause>),
}

impl Expr {
    /// Clauses in declaration order. Empty for [`Expr::Nothing`].
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        match self {
            Expr::Nothing => &[],
            Expr::Clauses(clauses) => clauses,
        }
    }
}
