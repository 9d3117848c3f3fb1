//! Column compiler.
//!
//! Resolves every clause of a parsed expression to a component and folds the
//! clauses into [`ColumnDescriptor`]s. Alongside the columns it derives the
//! families a system is matched with:
//!
//! - `and_from_entity`: components every matched entity must carry.
//! - `and_from_system`: components the system entity itself must carry.
//! - `not_from_entity`: components a matched entity must not carry.
//! - `not_from_component`: components that must not appear on any member of
//!   a matched family.

use engine_component::{Entity, FamilyAlgebra, FamilyId};
use serde::{Deserialize, Serialize};

use crate::ast::{Clause, ClauseOp, SourceKind};
use crate::error::SignatureError;
use crate::parser::Parser;

/// The payload of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnOp {
    And(Entity),
    Optional(Entity),
    /// Excludes; never binds data.
    Not(Entity),
    /// Union of alternatives; binds the first one present.
    Or(FamilyId),
}

/// One compiled column of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub source: SourceKind,
    pub op: ColumnOp,
}

impl ColumnDescriptor {
    /// The single component this column names, `None` for OR columns.
    #[must_use]
    pub fn component(&self) -> Option<Entity> {
        match self.op {
            ColumnOp::And(c) | ColumnOp::Optional(c) | ColumnOp::Not(c) => Some(c),
            ColumnOp::Or(_) => None,
        }
    }
}

/// A compiled signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// The source text.
    pub expr: String,
    pub columns: Vec<ColumnDescriptor>,
    pub and_from_entity: FamilyId,
    pub and_from_system: FamilyId,
    pub not_from_entity: FamilyId,
    pub not_from_component: FamilyId,
}

impl Signature {
    /// Returns `true` if any column reads from the matched entity, meaning the
    /// system has to be matched against tables.
    #[must_use]
    pub fn needs_tables(&self) -> bool {
        self.columns
            .iter()
            .any(|c| c.source == SourceKind::FromEntity)
    }

    /// Returns `true` for the degenerate `0` signature.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns `true` if any column reads from the system entity.
    #[must_use]
    pub fn has_system_columns(&self) -> bool {
        self.columns
            .iter()
            .any(|c| c.source == SourceKind::FromSystem)
    }
}

/// Parse and compile `expr`, resolving names through `algebra`.
pub fn compile<A: FamilyAlgebra + ?Sized>(
    expr: &str,
    algebra: &mut A,
) -> Result<Signature, SignatureError> {
    let parsed = Parser::parse(expr)?;
    let mut signature = Signature {
        expr: expr.to_string(),
        columns: Vec::new(),
        and_from_entity: FamilyId::EMPTY,
        and_from_system: FamilyId::EMPTY,
        not_from_entity: FamilyId::EMPTY,
        not_from_component: FamilyId::EMPTY,
    };
    for clause in parsed.clauses() {
        compile_clause(&mut signature, clause, algebra)?;
    }
    compute_and_families(&mut signature, algebra);
    Ok(signature)
}

fn compile_clause<A: FamilyAlgebra + ?Sized>(
    signature: &mut Signature,
    clause: &Clause,
    algebra: &mut A,
) -> Result<(), SignatureError> {
    let component = algebra
        .lookup(&clause.name)
        .ok_or_else(|| SignatureError::InvalidComponentId(clause.name.clone()))?;

    if clause.source == SourceKind::FromSystem && clause.op != ClauseOp::And {
        return Err(SignatureError::InvalidComponentExpression(format!(
            "SYSTEM.{} must be a plain AND column",
            clause.name
        )));
    }

    match clause.op {
        ClauseOp::And => signature.columns.push(ColumnDescriptor {
            source: clause.source,
            op: ColumnOp::And(component),
        }),
        ClauseOp::Optional => signature.columns.push(ColumnDescriptor {
            source: clause.source,
            op: ColumnOp::Optional(component),
        }),
        ClauseOp::Or => {
            let Some(previous) = signature.columns.last_mut() else {
                return Err(SignatureError::InvalidComponentExpression(format!(
                    "'|| {}' has no column to extend",
                    clause.name
                )));
            };
            if previous.source != clause.source {
                return Err(SignatureError::InvalidComponentExpression(format!(
                    "'|| {}' mixes sources within one OR column",
                    clause.name
                )));
            }
            let family = match previous.op {
                ColumnOp::And(first) => algebra.family_union(FamilyId::EMPTY, first),
                ColumnOp::Or(family) => family,
                ColumnOp::Not(_) | ColumnOp::Optional(_) => {
                    return Err(SignatureError::InvalidComponentExpression(format!(
                        "'|| {}' can only extend an AND or OR column",
                        clause.name
                    )));
                }
            };
            previous.op = ColumnOp::Or(algebra.family_union(family, component));
        }
        ClauseOp::Not => {
            signature.columns.push(ColumnDescriptor {
                source: SourceKind::FromId,
                op: ColumnOp::Not(component),
            });
            if clause.source == SourceKind::FromEntity {
                signature.not_from_entity = algebra.family_union(signature.not_from_entity, component);
            } else {
                signature.not_from_component =
                    algebra.family_union(signature.not_from_component, component);
            }
        }
    }
    Ok(())
}

fn compute_and_families<A: FamilyAlgebra + ?Sized>(signature: &mut Signature, algebra: &mut A) {
    for column in &signature.columns {
        let ColumnOp::And(component) = column.op else {
            continue;
        };
        match column.source {
            SourceKind::FromEntity => {
                signature.and_from_entity = algebra.family_union(signature.and_from_entity, component);
            }
            SourceKind::FromSystem => {
                signature.and_from_system = algebra.family_union(signature.and_from_system, component);
            }
            SourceKind::FromId => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_component::Store;

    fn store() -> Store {
        let mut store = Store::new();
        store.register_component::<[f32; 2]>("Position").unwrap();
        store.register_component::<[f32; 2]>("Velocity").unwrap();
        store.register_component::<f32>("Mass").unwrap();
        store.register_tag("Frozen").unwrap();
        store
    }

    fn id(store: &Store, name: &str) -> Entity {
        store.lookup(name).unwrap()
    }

    #[test]
    fn test_and_columns_in_order() {
        let mut store = store();
        let sig = compile("Position, Velocity", &mut store).unwrap();
        let position = id(&store, "Position");
        let velocity = id(&store, "Velocity");
        assert_eq!(
            sig.columns,
            vec![
                ColumnDescriptor {
                    source: SourceKind::FromEntity,
                    op: ColumnOp::And(position)
                },
                ColumnDescriptor {
                    source: SourceKind::FromEntity,
                    op: ColumnOp::And(velocity)
                },
            ]
        );
        assert_eq!(
            sig.and_from_entity,
            store.families_mut().intern(&[position, velocity])
        );
        assert!(sig.needs_tables());
    }

    #[test]
    fn test_not_folds_into_not_from_entity() {
        let mut store = store();
        let sig = compile("Position, !Velocity", &mut store).unwrap();
        let velocity = id(&store, "Velocity");
        assert_eq!(sig.columns.len(), 2);
        assert_eq!(
            sig.columns[1],
            ColumnDescriptor {
                source: SourceKind::FromId,
                op: ColumnOp::Not(velocity)
            }
        );
        let position = id(&store, "Position");
        assert_eq!(sig.not_from_entity, store.families_mut().intern(&[velocity]));
        assert_eq!(sig.not_from_component, FamilyId::EMPTY);
        assert_eq!(sig.and_from_entity, store.families_mut().intern(&[position]));
    }

    #[test]
    fn test_not_from_id_folds_into_not_from_component() {
        let mut store = store();
        let sig = compile("Position, !ID.Frozen", &mut store).unwrap();
        let frozen = id(&store, "Frozen");
        assert_eq!(sig.not_from_component, store.families_mut().intern(&[frozen]));
        assert_eq!(sig.not_from_entity, FamilyId::EMPTY);
    }

    #[test]
    fn test_or_builds_one_family_column() {
        let mut store = store();
        let sig = compile("Position || Velocity", &mut store).unwrap();
        let members = [id(&store, "Position"), id(&store, "Velocity")];
        let both = store.families_mut().intern(&members);
        assert_eq!(
            sig.columns,
            vec![ColumnDescriptor {
                source: SourceKind::FromEntity,
                op: ColumnOp::Or(both)
            }]
        );
        assert_eq!(sig.and_from_entity, FamilyId::EMPTY);
    }

    #[test]
    fn test_or_mixing_sources_is_rejected() {
        let mut store = store();
        assert!(matches!(
            compile("ENTITY.Position || SYSTEM.Velocity", &mut store),
            Err(SignatureError::InvalidComponentExpression(_))
        ));
    }

    #[test]
    fn test_or_cannot_extend_optional() {
        let mut store = store();
        assert!(matches!(
            compile("?Position || Velocity", &mut store),
            Err(SignatureError::InvalidComponentExpression(_))
        ));
    }

    #[test]
    fn test_system_source_requires_and() {
        let mut store = store();
        assert!(matches!(
            compile("Position, ?SYSTEM.Mass", &mut store),
            Err(SignatureError::InvalidComponentExpression(_))
        ));
        let sig = compile("Position, SYSTEM.Mass", &mut store).unwrap();
        let mass = id(&store, "Mass");
        assert_eq!(sig.and_from_system, store.families_mut().intern(&[mass]));
        assert!(sig.has_system_columns());
    }

    #[test]
    fn test_unknown_component() {
        let mut store = store();
        assert_eq!(
            compile("Position, Health", &mut store),
            Err(SignatureError::InvalidComponentId("Health".to_string()))
        );
    }

    #[test]
    fn test_nonzero_integer_is_an_unknown_component() {
        let mut store = store();
        assert_eq!(
            compile("Position, 5", &mut store),
            Err(SignatureError::InvalidComponentId("5".to_string()))
        );
    }

    #[test]
    fn test_zero_compiles_to_no_columns() {
        let mut store = store();
        let sig = compile("0", &mut store).unwrap();
        assert!(sig.is_empty());
        assert!(!sig.needs_tables());
    }

    #[test]
    fn test_not_alone_needs_no_tables() {
        let mut store = store();
        let sig = compile("!Position", &mut store).unwrap();
        assert!(!sig.is_empty());
        assert!(!sig.needs_tables());
    }
}
