//! Core lowering runtime for Trellis: the SQL-level expression node model,
//! the shape tree handed to the materializer, and the pass that rewrites
//! logical collection shapes into correlated array subqueries.

#![warn(unreachable_pub)]

pub mod error;
pub mod lower;
pub mod obs;
pub mod shape;
pub mod sql;

pub use error::Error;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sinks, or validation helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        lower::{CollectionLoweringPass, SplitBehavior},
        shape::{
            CollectionArrayShape, CollectionId, CollectionShape, EntityMember, EntityShape,
            Navigation, ProjectionBinding, ShapedQuery, ShaperExpr, TypeRef,
        },
        sql::{ArraySubqueryExpr, RowValueExpr, SelectQuery, SqlExpr, SqlType},
    };
}
