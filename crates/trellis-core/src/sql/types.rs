//! Static result types for SQL-level expression nodes.

use std::fmt;

///
/// SqlType
///
/// Closed vocabulary of static types this core reasons about. The full
/// provider type catalog lives outside; only the shapes that matter for
/// array/row transport are modeled here.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum SqlType {
    Bool,
    Int,
    Text,
    /// One anonymous row assembled positionally.
    Record,
    Array(Box<Self>),
}

impl SqlType {
    #[must_use]
    pub fn array(element: Self) -> Self {
        Self::Array(Box::new(element))
    }

    /// True when values of this type travel as an array of generic rows.
    #[must_use]
    pub fn is_row_array(&self) -> bool {
        matches!(self, Self::Array(element) if **element == Self::Record)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Text => write!(f, "text"),
            Self::Record => write!(f, "record"),
            Self::Array(element) => write!(f, "{element}[]"),
        }
    }
}

///
/// LiteralValue
///
/// Literal scalars usable in projections. No floats: every variant has
/// total equality, so `Eq` and `Hash` derive soundly for whole trees.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl LiteralValue {
    #[must_use]
    pub const fn ty(&self) -> SqlType {
        match self {
            // NULL has no better static type than text in this core.
            Self::Null | Self::Text(_) => SqlType::Text,
            Self::Bool(_) => SqlType::Bool,
            Self::Int(_) => SqlType::Int,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "'{value}'"),
        }
    }
}
