//! Shaper expression tree: the materializer-facing description of how one
//! row set becomes an object graph.
//!
//! Nodes are immutable and structurally shared (`Arc`); rewriting returns
//! the original handle whenever nothing underneath changed. The logical
//! collection shape exists only between the upstream translator and the
//! lowering pass; the physical collection-array shape is what survives
//! into the compiled query.

use crate::sql::{ArraySubqueryExpr, SelectQuery};
use derive_more::Display;
use serde::Serialize;
use std::sync::Arc;

///
/// CollectionId
///
/// Process-unique identifier correlating one physical collection-array
/// shape with its subquery construct in the physical plan. Assigned
/// monotonically by the lowering pass, never reused, and opaque to every
/// later transformation — correlation is by this id, never by position.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[display("{_0}")]
pub struct CollectionId(u32);

impl CollectionId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

///
/// ProjectionBinding
///
/// Addresses one slot of the owning query's projection. The owning query
/// structure itself is identified by traversal context: sub-plans are
/// owned by their enclosing query, so a bare index resolves unambiguously.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ProjectionBinding {
    index: usize,
}

impl ProjectionBinding {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self { index }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

///
/// Navigation
/// Originating navigation property; absent for anonymous projected
/// collections.
///

#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
#[display("{name}")]
pub struct Navigation {
    name: String,
}

impl Navigation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

///
/// TypeRef
/// Nominal element type of a shaped value.
///

#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
#[display("{name}")]
pub struct TypeRef {
    name: String,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

///
/// ShaperExpr
///
/// Handle over the closed set of shaper node kinds. Clones share
/// subtrees; [`ShaperExpr::same_node`] is the pointer-identity check the
/// rewrite contract is stated in.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ShaperExpr {
    Entity(Arc<EntityShape>),
    Projection(ProjectionBinding),
    Collection(Arc<CollectionShape>),
    CollectionArray(Arc<CollectionArrayShape>),
    ShapedQuery(Arc<ShapedQuery>),
}

impl ShaperExpr {
    /// Pointer identity for composite nodes, value identity for leaves.
    #[must_use]
    pub fn same_node(left: &Self, right: &Self) -> bool {
        match (left, right) {
            (Self::Entity(a), Self::Entity(b)) => Arc::ptr_eq(a, b),
            (Self::Projection(a), Self::Projection(b)) => a == b,
            (Self::Collection(a), Self::Collection(b)) => Arc::ptr_eq(a, b),
            (Self::CollectionArray(a), Self::CollectionArray(b)) => Arc::ptr_eq(a, b),
            (Self::ShapedQuery(a), Self::ShapedQuery(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

///
/// EntityShape
///
/// Shapes one entity instance from named member shapers, in declaration
/// order. Members may themselves be collections or nested shaped queries.
///

#[derive(Debug, Eq, Hash, PartialEq)]
pub struct EntityShape {
    element_type: TypeRef,
    members: Vec<EntityMember>,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct EntityMember {
    pub name: String,
    pub shaper: ShaperExpr,
}

impl EntityMember {
    pub fn new(name: impl Into<String>, shaper: ShaperExpr) -> Self {
        Self {
            name: name.into(),
            shaper,
        }
    }
}

impl EntityShape {
    #[must_use]
    pub const fn new(element_type: TypeRef, members: Vec<EntityMember>) -> Self {
        Self {
            element_type,
            members,
        }
    }

    #[must_use]
    pub const fn element_type(&self) -> &TypeRef {
        &self.element_type
    }

    #[must_use]
    pub fn members(&self) -> &[EntityMember] {
        &self.members
    }

    /// Identity-preserving rewrite with replacement members.
    #[must_use]
    pub fn update(self: &Arc<Self>, members: Vec<EntityMember>) -> Arc<Self> {
        if members == self.members {
            Arc::clone(self)
        } else {
            Arc::new(Self {
                element_type: self.element_type.clone(),
                members,
            })
        }
    }
}

///
/// CollectionShape
///
/// Logical "materialize a collection of child objects here" node.
/// Produced by the upstream translator, consumed and replaced by the
/// lowering pass; never persists past lowering.
///

#[derive(Debug, Eq, Hash, PartialEq)]
pub struct CollectionShape {
    binding: ProjectionBinding,
    element_shaper: ShaperExpr,
    navigation: Option<Navigation>,
    element_type: TypeRef,
}

impl CollectionShape {
    #[must_use]
    pub const fn new(
        binding: ProjectionBinding,
        element_shaper: ShaperExpr,
        navigation: Option<Navigation>,
        element_type: TypeRef,
    ) -> Self {
        Self {
            binding,
            element_shaper,
            navigation,
            element_type,
        }
    }

    #[must_use]
    pub const fn binding(&self) -> ProjectionBinding {
        self.binding
    }

    #[must_use]
    pub const fn element_shaper(&self) -> &ShaperExpr {
        &self.element_shaper
    }

    #[must_use]
    pub const fn navigation(&self) -> Option<&Navigation> {
        self.navigation.as_ref()
    }

    #[must_use]
    pub const fn element_type(&self) -> &TypeRef {
        &self.element_type
    }
}

///
/// CollectionArrayShape
///
/// Physical form of a collection shape: the same binding, the sub-plan in
/// correlated array-producing form, the lowered element shaper, and the
/// process-unique collection id that correlates this node with the
/// physical plan at materialization time.
///

#[derive(Debug, Eq, Hash, PartialEq)]
pub struct CollectionArrayShape {
    collection_id: CollectionId,
    binding: ProjectionBinding,
    subquery: Arc<ArraySubqueryExpr>,
    element_shaper: ShaperExpr,
    navigation: Option<Navigation>,
    element_type: TypeRef,
}

impl CollectionArrayShape {
    #[must_use]
    pub const fn new(
        collection_id: CollectionId,
        binding: ProjectionBinding,
        subquery: Arc<ArraySubqueryExpr>,
        element_shaper: ShaperExpr,
        navigation: Option<Navigation>,
        element_type: TypeRef,
    ) -> Self {
        Self {
            collection_id,
            binding,
            subquery,
            element_shaper,
            navigation,
            element_type,
        }
    }

    #[must_use]
    pub const fn collection_id(&self) -> CollectionId {
        self.collection_id
    }

    #[must_use]
    pub const fn binding(&self) -> ProjectionBinding {
        self.binding
    }

    #[must_use]
    pub const fn subquery(&self) -> &Arc<ArraySubqueryExpr> {
        &self.subquery
    }

    #[must_use]
    pub const fn element_shaper(&self) -> &ShaperExpr {
        &self.element_shaper
    }

    #[must_use]
    pub const fn navigation(&self) -> Option<&Navigation> {
        self.navigation.as_ref()
    }

    #[must_use]
    pub const fn element_type(&self) -> &TypeRef {
        &self.element_type
    }

    /// Identity-preserving rewrite of the element shaper. The collection
    /// id travels unchanged: it is opaque data, never recomputed.
    #[must_use]
    pub fn update(self: &Arc<Self>, element_shaper: ShaperExpr) -> Arc<Self> {
        if ShaperExpr::same_node(&self.element_shaper, &element_shaper)
            || self.element_shaper == element_shaper
        {
            Arc::clone(self)
        } else {
            Arc::new(Self {
                collection_id: self.collection_id,
                binding: self.binding,
                subquery: Arc::clone(&self.subquery),
                element_shaper,
                navigation: self.navigation.clone(),
                element_type: self.element_type.clone(),
            })
        }
    }
}

///
/// ShapedQuery
///
/// A query structure paired with the shaper tree over its projection.
/// This is both the lowering pass's input/output and an in-tree node for
/// independent nested queries.
///

#[derive(Debug, Eq, Hash, PartialEq)]
pub struct ShapedQuery {
    query: SelectQuery,
    shaper: ShaperExpr,
}

impl ShapedQuery {
    #[must_use]
    pub const fn new(query: SelectQuery, shaper: ShaperExpr) -> Self {
        Self { query, shaper }
    }

    #[must_use]
    pub const fn query(&self) -> &SelectQuery {
        &self.query
    }

    #[must_use]
    pub const fn shaper(&self) -> &ShaperExpr {
        &self.shaper
    }

    #[must_use]
    pub fn into_parts(self) -> (SelectQuery, ShaperExpr) {
        (self.query, self.shaper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{SqlExpr, SqlType};

    fn array_subquery() -> Arc<ArraySubqueryExpr> {
        let mut subquery = SelectQuery::new("orders");
        subquery.push_scalar(SqlExpr::column("id", SqlType::Int));
        Arc::new(ArraySubqueryExpr::new(Arc::new(subquery)))
    }

    fn physical_shape() -> Arc<CollectionArrayShape> {
        Arc::new(CollectionArrayShape::new(
            CollectionId::new(7),
            ProjectionBinding::new(1),
            array_subquery(),
            ShaperExpr::Projection(ProjectionBinding::new(0)),
            Some(Navigation::new("Orders")),
            TypeRef::new("Order"),
        ))
    }

    #[test]
    fn physical_shape_update_preserves_identity_when_unchanged() {
        let shape = physical_shape();

        let same = shape.update(ShaperExpr::Projection(ProjectionBinding::new(0)));
        assert!(Arc::ptr_eq(&shape, &same));

        let changed = shape.update(ShaperExpr::Projection(ProjectionBinding::new(2)));
        assert!(!Arc::ptr_eq(&shape, &changed));
        // The id travels uninterpreted through the rewrite.
        assert_eq!(changed.collection_id(), CollectionId::new(7));
    }

    #[test]
    fn entity_update_preserves_identity_when_members_are_equal() {
        let entity = Arc::new(EntityShape::new(
            TypeRef::new("Customer"),
            vec![EntityMember::new(
                "Id",
                ShaperExpr::Projection(ProjectionBinding::new(0)),
            )],
        ));

        let same = entity.update(vec![EntityMember::new(
            "Id",
            ShaperExpr::Projection(ProjectionBinding::new(0)),
        )]);
        assert!(Arc::ptr_eq(&entity, &same));
    }

    #[test]
    fn same_node_distinguishes_equal_but_distinct_composites() {
        let a = ShaperExpr::CollectionArray(physical_shape());
        let b = ShaperExpr::CollectionArray(physical_shape());

        assert_eq!(a, b);
        assert!(!ShaperExpr::same_node(&a, &b));
        assert!(ShaperExpr::same_node(&a, &a.clone()));
    }

    #[test]
    fn shaper_trees_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<ShaperExpr>();
        assert_send_sync::<ShapedQuery>();
    }
}
