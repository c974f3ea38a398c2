//! Immutable SQL-level expression nodes with structural sharing.
//!
//! Composite nodes live behind `Arc` and are never mutated in place;
//! rewriting returns either the original handle (pointer-identical) or a
//! brand-new node. Downstream passes rely on that identity contract to
//! skip unchanged subtrees.

use crate::sql::{LiteralValue, RowArrayTypeMapping, SelectQuery, SqlType};
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

///
/// ExprError
/// Invalid node construction; a caller contract violation, detected
/// eagerly and never recoverable at runtime.
///

#[derive(Debug, ThisError)]
pub enum ExprError {
    #[error("row value requires at least one column")]
    EmptyRowValue,

    #[error("row value rewrite must preserve arity: expected {expected}, found {found}")]
    RowValueArityMismatch { expected: usize, found: usize },
}

///
/// SqlExpr
///
/// Handle over the closed set of expression kinds this core rewrites.
/// Leaves are small inline values; composites are shared `Arc`s, so a
/// clone of the handle shares the subtree.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum SqlExpr {
    Column(ColumnExpr),
    Literal(LiteralExpr),
    RowValue(Arc<RowValueExpr>),
    ArraySubquery(Arc<ArraySubqueryExpr>),
}

impl SqlExpr {
    pub fn column(name: impl Into<String>, ty: SqlType) -> Self {
        Self::Column(ColumnExpr {
            name: name.into(),
            ty,
        })
    }

    #[must_use]
    pub const fn literal(value: LiteralValue) -> Self {
        Self::Literal(LiteralExpr { value })
    }

    /// Static result type of this node.
    #[must_use]
    pub fn ty(&self) -> SqlType {
        match self {
            Self::Column(column) => column.ty.clone(),
            Self::Literal(literal) => literal.value.ty(),
            Self::RowValue(row) => row.ty(),
            Self::ArraySubquery(array) => array.ty(),
        }
    }

    /// Transport mapping for this node, present exactly when its static
    /// type implies array-of-row transport.
    #[must_use]
    pub fn row_array_mapping(&self) -> Option<RowArrayTypeMapping> {
        match self {
            Self::RowValue(row) => Some(row.type_mapping()),
            _ => self.ty().is_row_array().then(RowArrayTypeMapping::default),
        }
    }
}

impl fmt::Display for SqlExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(column) => write!(f, "{}", column.name),
            Self::Literal(literal) => write!(f, "{}", literal.value),
            Self::RowValue(row) => {
                write!(f, "ROW(")?;
                for (position, value) in row.values().iter().enumerate() {
                    if position > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            // The ARRAY tag is part of the diagnostic contract.
            Self::ArraySubquery(array) => write!(f, "ARRAY ({})", array.subquery()),
        }
    }
}

///
/// ColumnExpr
/// Scalar column reference; a leaf.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ColumnExpr {
    pub name: String,
    pub ty: SqlType,
}

///
/// LiteralExpr
/// Literal scalar; a leaf.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct LiteralExpr {
    pub value: LiteralValue,
}

///
/// RowValueExpr
///
/// Ordered, fixed-arity sequence of scalar sub-expressions assembled
/// positionally into one row. Arity and per-slot types are fixed at
/// construction; rewriting preserves arity.
///

#[derive(Debug, Eq, Hash, PartialEq)]
pub struct RowValueExpr {
    values: Vec<SqlExpr>,
}

impl RowValueExpr {
    pub fn new(values: Vec<SqlExpr>) -> Result<Self, ExprError> {
        if values.is_empty() {
            return Err(ExprError::EmptyRowValue);
        }

        Ok(Self { values })
    }

    #[must_use]
    pub fn values(&self) -> &[SqlExpr] {
        &self.values
    }

    /// Result type fixed at construction: rows travel in the
    /// array-of-generic-rows transport form.
    #[must_use]
    pub fn ty(&self) -> SqlType {
        SqlType::array(SqlType::Record)
    }

    #[must_use]
    pub fn type_mapping(&self) -> RowArrayTypeMapping {
        RowArrayTypeMapping::default()
    }

    /// Identity-preserving rewrite: a pairwise-equal replacement sequence
    /// returns the original handle unchanged.
    pub fn update(self: &Arc<Self>, values: Vec<SqlExpr>) -> Result<Arc<Self>, ExprError> {
        if values.len() != self.values.len() {
            return Err(ExprError::RowValueArityMismatch {
                expected: self.values.len(),
                found: values.len(),
            });
        }

        if values == self.values {
            Ok(Arc::clone(self))
        } else {
            // Arity matched a non-empty node, so the result is non-empty.
            Ok(Arc::new(Self { values }))
        }
    }
}

///
/// ArraySubqueryExpr
///
/// Correlated sub-plan whose single projected column is materialized into
/// one array value per outer row instead of joined row-by-row.
///
/// Precondition: `subquery` projects exactly one scalar column at the time
/// of wrapping. The conversion entry point on [`SelectQuery`] is the only
/// in-repo producer and enforces this; it is not re-validated here.
///

#[derive(Debug, Eq, Hash, PartialEq)]
pub struct ArraySubqueryExpr {
    subquery: Arc<SelectQuery>,
}

impl ArraySubqueryExpr {
    #[must_use]
    pub fn new(subquery: Arc<SelectQuery>) -> Self {
        debug_assert!(
            subquery.single_scalar().is_some(),
            "array subquery requires a single-column scalar projection"
        );

        Self { subquery }
    }

    #[must_use]
    pub const fn subquery(&self) -> &Arc<SelectQuery> {
        &self.subquery
    }

    /// Static result type: the projected column's type lifted to an array.
    /// Columns already in row-array transport form pass through unchanged.
    #[must_use]
    pub fn ty(&self) -> SqlType {
        match self.subquery.single_scalar().map(SqlExpr::ty) {
            Some(ty) if ty.is_row_array() => ty,
            Some(ty) => SqlType::array(ty),
            // Unreachable under the construction precondition.
            None => SqlType::array(SqlType::Record),
        }
    }

    /// Identity-preserving rewrite with a replacement sub-plan.
    #[must_use]
    pub fn update(self: &Arc<Self>, subquery: Arc<SelectQuery>) -> Arc<Self> {
        if Arc::ptr_eq(&self.subquery, &subquery) || *self.subquery == *subquery {
            Arc::clone(self)
        } else {
            Arc::new(Self::new(subquery))
        }
    }
}
