//! Minimal mutable query structure: the lowering pass's collaborator.
//!
//! The real surrounding compiler owns a much richer query representation;
//! this module models exactly the surface the pass depends on — projection
//! slots addressable by binding, and the in-place conversion of a pending
//! collection source into a correlated array subquery.

use crate::{
    lower::LoweringContext,
    obs::DiagnosticEvent,
    shape::{CollectionArrayShape, CollectionId, Navigation, ProjectionBinding, ShaperExpr, TypeRef},
    sql::{ArraySubqueryExpr, RowValueExpr, SqlExpr},
};
use std::{fmt, sync::Arc};

///
/// ProjectionSlot
///
/// One position of a query's projection: either a scalar expression or a
/// correlated row source still awaiting collection lowering.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ProjectionSlot {
    Scalar(SqlExpr),
    Collection(SelectQuery),
}

///
/// SelectQuery
///
/// One SQL-level query: a named row source plus an ordered projection.
/// Mutable by design — the lowering pass augments it in place, which is
/// why lowering is referentially transparent on the shape tree only.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SelectQuery {
    source: String,
    projection: Vec<ProjectionSlot>,
}

impl SelectQuery {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            projection: Vec::new(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn projection(&self) -> &[ProjectionSlot] {
        &self.projection
    }

    /// Append a scalar column and return its binding.
    pub fn push_scalar(&mut self, expr: SqlExpr) -> ProjectionBinding {
        self.projection.push(ProjectionSlot::Scalar(expr));
        ProjectionBinding::new(self.projection.len() - 1)
    }

    /// Append a pending correlated row source and return its binding.
    pub fn push_collection(&mut self, subquery: Self) -> ProjectionBinding {
        self.projection.push(ProjectionSlot::Collection(subquery));
        ProjectionBinding::new(self.projection.len() - 1)
    }

    /// Mutable access to a pending sub-plan, so inner shapes can be
    /// lowered in their owning query's context.
    pub(crate) fn collection_source_mut(&mut self, index: usize) -> Option<&mut Self> {
        match self.projection.get_mut(index) {
            Some(ProjectionSlot::Collection(subquery)) => Some(subquery),
            _ => None,
        }
    }

    /// The single projected scalar, when the projection is exactly one
    /// scalar column wide.
    #[must_use]
    pub fn single_scalar(&self) -> Option<&SqlExpr> {
        match self.projection.as_slice() {
            [ProjectionSlot::Scalar(expr)] => Some(expr),
            _ => None,
        }
    }

    /// Convert the pending collection source at `index` into a correlated
    /// array subquery, in place, and return the physical shape node.
    ///
    /// Returns `None` when the conversion is structurally impossible: the
    /// slot is absent, is not a pending collection source (including a slot
    /// already converted by an earlier call), or the sub-plan cannot
    /// collapse to a single projected column. The inner shaper and
    /// navigation metadata are never dropped on success.
    pub fn apply_collection_array(
        &mut self,
        index: usize,
        collection_id: CollectionId,
        element_shaper: ShaperExpr,
        navigation: Option<Navigation>,
        element_type: TypeRef,
        ctx: LoweringContext<'_>,
    ) -> Option<CollectionArrayShape> {
        let collapsed = match self.projection.get(index) {
            Some(ProjectionSlot::Collection(pending)) => pending.collapsed_single_column()?,
            _ => return None,
        };

        // CONTRACT: the pass made the caller's splitting preference
        // available so the implicit single-query choice is observable.
        if ctx.splitting.is_none() {
            ctx.sink.record(DiagnosticEvent::ImplicitSingleQuery {
                collection_id,
                navigation: navigation.as_ref().map(|nav| nav.name().to_string()),
            });
        }

        let subquery = Arc::new(ArraySubqueryExpr::new(Arc::new(collapsed)));
        self.projection[index] = ProjectionSlot::Scalar(SqlExpr::ArraySubquery(Arc::clone(
            &subquery,
        )));

        Some(CollectionArrayShape::new(
            collection_id,
            ProjectionBinding::new(index),
            subquery,
            element_shaper,
            navigation,
            element_type,
        ))
    }

    /// Rebuild this sub-plan with a single projected column: the lone
    /// scalar as-is, several scalars wrapped into one row constructor.
    /// `None` when the projection is empty or a pending collection slot
    /// survived inner lowering.
    fn collapsed_single_column(&self) -> Option<Self> {
        let mut scalars = Vec::with_capacity(self.projection.len());
        for slot in &self.projection {
            match slot {
                ProjectionSlot::Scalar(expr) => scalars.push(expr.clone()),
                ProjectionSlot::Collection(_) => return None,
            }
        }

        let column = if scalars.len() == 1 {
            scalars.swap_remove(0)
        } else {
            SqlExpr::RowValue(Arc::new(RowValueExpr::new(scalars).ok()?))
        };

        Some(Self {
            source: self.source.clone(),
            projection: vec![ProjectionSlot::Scalar(column)],
        })
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        for (position, slot) in self.projection.iter().enumerate() {
            if position > 0 {
                write!(f, ", ")?;
            }
            match slot {
                ProjectionSlot::Scalar(expr) => write!(f, "{expr}")?,
                ProjectionSlot::Collection(subquery) => write!(f, "COLLECTION ({subquery})")?,
            }
        }
        write!(f, " FROM {}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lower::SplitBehavior,
        obs::SilentSink,
        shape::ShaperExpr,
        sql::SqlType,
    };

    fn single_query_ctx() -> LoweringContext<'static> {
        LoweringContext {
            splitting: Some(SplitBehavior::SingleQuery),
            sink: &SilentSink,
        }
    }

    fn orders_subquery() -> SelectQuery {
        let mut subquery = SelectQuery::new("orders");
        subquery.push_scalar(SqlExpr::column("id", SqlType::Int));
        subquery.push_scalar(SqlExpr::column("total", SqlType::Int));
        subquery
    }

    fn element_shaper() -> ShaperExpr {
        ShaperExpr::Projection(ProjectionBinding::new(0))
    }

    #[test]
    fn conversion_replaces_the_pending_slot_with_an_array_subquery() {
        let mut query = SelectQuery::new("customers");
        query.push_scalar(SqlExpr::column("id", SqlType::Int));
        let binding = query.push_collection(orders_subquery());

        let shape = query
            .apply_collection_array(
                binding.index(),
                CollectionId::new(0),
                element_shaper(),
                Some(Navigation::new("Orders")),
                TypeRef::new("Order"),
                single_query_ctx(),
            )
            .expect("pending slot converts");

        assert_eq!(shape.binding(), binding);
        match &query.projection()[binding.index()] {
            ProjectionSlot::Scalar(SqlExpr::ArraySubquery(subquery)) => {
                // Multi-column sub-projection collapsed through ROW(...).
                assert!(subquery.subquery().single_scalar().is_some());
            }
            other => panic!("expected array subquery slot, got {other:?}"),
        }
    }

    #[test]
    fn conversion_is_structural_and_fails_on_non_collection_slots() {
        let mut query = SelectQuery::new("customers");
        let binding = query.push_scalar(SqlExpr::column("id", SqlType::Int));

        let shape = query.apply_collection_array(
            binding.index(),
            CollectionId::new(0),
            element_shaper(),
            None,
            TypeRef::new("Order"),
            single_query_ctx(),
        );
        assert!(shape.is_none());
    }

    #[test]
    fn second_conversion_for_the_same_index_fails_structurally() {
        let mut query = SelectQuery::new("customers");
        let binding = query.push_collection(orders_subquery());

        let first = query.apply_collection_array(
            binding.index(),
            CollectionId::new(0),
            element_shaper(),
            None,
            TypeRef::new("Order"),
            single_query_ctx(),
        );
        assert!(first.is_some());

        let second = query.apply_collection_array(
            binding.index(),
            CollectionId::new(1),
            element_shaper(),
            None,
            TypeRef::new("Order"),
            single_query_ctx(),
        );
        assert!(second.is_none());
    }

    #[test]
    fn empty_sub_projection_is_not_convertible() {
        let mut query = SelectQuery::new("customers");
        let binding = query.push_collection(SelectQuery::new("orders"));

        let shape = query.apply_collection_array(
            binding.index(),
            CollectionId::new(0),
            element_shaper(),
            None,
            TypeRef::new("Order"),
            single_query_ctx(),
        );
        assert!(shape.is_none());
    }

    #[test]
    fn trace_renders_projection_in_order() {
        let mut query = SelectQuery::new("customers");
        query.push_scalar(SqlExpr::column("id", SqlType::Int));
        query.push_collection(orders_subquery());

        assert_eq!(
            query.to_string(),
            "SELECT id, COLLECTION (SELECT id, total FROM orders) FROM customers"
        );
    }
}
