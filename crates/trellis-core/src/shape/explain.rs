//! Deterministic, read-only trace of shaper trees; must not rewrite.
//!
//! The rendered shape is consumed by downstream debugging tools: a
//! collection-array node always reports its id, its navigation name (or
//! its absence), and a recursive trace of its element shaper. Exact text
//! may evolve; the shape of the trace must not.

use crate::{
    shape::{CollectionId, ShapedQuery, ShaperExpr},
    sql::SqlExpr,
};
use serde::Serialize;
use std::fmt;

///
/// ShapeExplain
///
/// Stable, deterministic representation of a shaper tree for
/// observability.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum ShapeExplain {
    Entity {
        element_type: String,
        members: Vec<ExplainMember>,
    },
    Projection {
        index: usize,
    },
    Collection {
        navigation: Option<String>,
        element_type: String,
        element: Box<Self>,
    },
    CollectionArray {
        id: CollectionId,
        navigation: Option<String>,
        element_type: String,
        query: String,
        /// Storage name of the row-array transport mapping, when the
        /// projected column travels as an array of rows.
        transport: Option<String>,
        element: Box<Self>,
    },
    ShapedQuery {
        query: String,
        shaper: Box<Self>,
    },
}

///
/// ExplainMember
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExplainMember {
    pub name: String,
    pub shape: ShapeExplain,
}

/// Build the explain tree for one shaper expression.
#[must_use]
pub fn explain_shaper(shaper: &ShaperExpr) -> ShapeExplain {
    match shaper {
        ShaperExpr::Entity(entity) => ShapeExplain::Entity {
            element_type: entity.element_type().name().to_string(),
            members: entity
                .members()
                .iter()
                .map(|member| ExplainMember {
                    name: member.name.clone(),
                    shape: explain_shaper(&member.shaper),
                })
                .collect(),
        },
        ShaperExpr::Projection(binding) => ShapeExplain::Projection {
            index: binding.index(),
        },
        ShaperExpr::Collection(shape) => ShapeExplain::Collection {
            navigation: shape.navigation().map(|nav| nav.name().to_string()),
            element_type: shape.element_type().name().to_string(),
            element: Box::new(explain_shaper(shape.element_shaper())),
        },
        ShaperExpr::CollectionArray(shape) => ShapeExplain::CollectionArray {
            id: shape.collection_id(),
            navigation: shape.navigation().map(|nav| nav.name().to_string()),
            element_type: shape.element_type().name().to_string(),
            query: format!("ARRAY ({})", shape.subquery().subquery()),
            transport: shape
                .subquery()
                .subquery()
                .single_scalar()
                .and_then(SqlExpr::row_array_mapping)
                .map(|mapping| mapping.store_type().to_string()),
            element: Box::new(explain_shaper(shape.element_shaper())),
        },
        ShaperExpr::ShapedQuery(shaped) => ShapeExplain::ShapedQuery {
            query: shaped.query().to_string(),
            shaper: Box::new(explain_shaper(shaped.shaper())),
        },
    }
}

/// Build the explain tree for a whole shaped query.
#[must_use]
pub fn explain_shaped_query(shaped: &ShapedQuery) -> ShapeExplain {
    ShapeExplain::ShapedQuery {
        query: shaped.query().to_string(),
        shaper: Box::new(explain_shaper(shaped.shaper())),
    }
}

impl ShapeExplain {
    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        match self {
            Self::Entity {
                element_type,
                members,
            } => {
                writeln!(f, "{pad}ENTITY {element_type}")?;
                for member in members {
                    writeln!(f, "{pad}  .{}:", member.name)?;
                    member.shape.render(f, depth + 2)?;
                }
                Ok(())
            }
            Self::Projection { index } => writeln!(f, "{pad}PROJECTION [{index}]"),
            Self::Collection {
                navigation,
                element_type,
                element,
            } => {
                writeln!(
                    f,
                    "{pad}COLLECTION navigation={} type={element_type}",
                    navigation.as_deref().unwrap_or("<none>"),
                )?;
                element.render(f, depth + 1)
            }
            Self::CollectionArray {
                id,
                navigation,
                element_type,
                query,
                transport,
                element,
            } => {
                writeln!(
                    f,
                    "{pad}COLLECTION_ARRAY id={id} navigation={} type={element_type}",
                    navigation.as_deref().unwrap_or("<none>"),
                )?;
                writeln!(f, "{pad}  query: {query}")?;
                if let Some(transport) = transport {
                    writeln!(f, "{pad}  transport: {transport}")?;
                }
                element.render(f, depth + 1)
            }
            Self::ShapedQuery { query, shaper } => {
                writeln!(f, "{pad}SHAPED_QUERY {query}")?;
                shaper.render(f, depth + 1)
            }
        }
    }
}

impl fmt::Display for ShapeExplain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lower::{LoweringContext, SplitBehavior},
        obs::SilentSink,
        shape::{
            CollectionId, CollectionShape, EntityMember, EntityShape, Navigation,
            ProjectionBinding, TypeRef,
        },
        sql::{SelectQuery, SqlExpr, SqlType},
    };
    use std::sync::Arc;

    fn lowered_orders_shape_with(columns: &[&str]) -> ShaperExpr {
        let mut orders = SelectQuery::new("orders");
        for column in columns {
            orders.push_scalar(SqlExpr::column(*column, SqlType::Int));
        }

        let mut customers = SelectQuery::new("customers");
        let binding = customers.push_collection(orders);

        let shape = customers
            .apply_collection_array(
                binding.index(),
                CollectionId::new(0),
                ShaperExpr::Projection(ProjectionBinding::new(0)),
                Some(Navigation::new("Orders")),
                TypeRef::new("Order"),
                LoweringContext {
                    splitting: Some(SplitBehavior::SingleQuery),
                    sink: &SilentSink,
                },
            )
            .expect("pending slot converts");

        ShaperExpr::CollectionArray(Arc::new(shape))
    }

    fn lowered_orders_shape() -> ShaperExpr {
        lowered_orders_shape_with(&["id"])
    }

    #[test]
    fn collection_array_trace_reports_id_navigation_and_element() {
        let explain = explain_shaper(&lowered_orders_shape());

        match &explain {
            ShapeExplain::CollectionArray {
                id,
                navigation,
                query,
                element,
                ..
            } => {
                assert_eq!(*id, CollectionId::new(0));
                assert_eq!(navigation.as_deref(), Some("Orders"));
                assert!(query.starts_with("ARRAY ("));
                assert_eq!(**element, ShapeExplain::Projection { index: 0 });
            }
            other => panic!("expected collection array explain, got {other:?}"),
        }

        let rendered = explain.to_string();
        assert!(rendered.contains("id=0"), "got: {rendered}");
        assert!(rendered.contains("navigation=Orders"), "got: {rendered}");
        assert!(rendered.contains("PROJECTION [0]"), "got: {rendered}");
    }

    #[test]
    fn row_array_transport_is_reported_for_collapsed_projections() {
        let explain = explain_shaper(&lowered_orders_shape_with(&["id", "total"]));

        match &explain {
            ShapeExplain::CollectionArray { transport, .. } => {
                assert_eq!(transport.as_deref(), Some("record[]"));
            }
            other => panic!("expected collection array explain, got {other:?}"),
        }

        let rendered = explain.to_string();
        assert!(rendered.contains("transport: record[]"), "got: {rendered}");
    }

    #[test]
    fn scalar_transport_reports_no_row_array_mapping() {
        let explain = explain_shaper(&lowered_orders_shape());

        match &explain {
            ShapeExplain::CollectionArray { transport, .. } => assert!(transport.is_none()),
            other => panic!("expected collection array explain, got {other:?}"),
        }
    }

    #[test]
    fn absent_navigation_is_rendered_explicitly() {
        let shape = ShaperExpr::Collection(Arc::new(CollectionShape::new(
            ProjectionBinding::new(1),
            ShaperExpr::Projection(ProjectionBinding::new(0)),
            None,
            TypeRef::new("Order"),
        )));

        let rendered = explain_shaper(&shape).to_string();
        assert!(rendered.contains("navigation=<none>"), "got: {rendered}");
    }

    #[test]
    fn explain_json_shape_is_stable() {
        let entity = ShaperExpr::Entity(Arc::new(EntityShape::new(
            TypeRef::new("Customer"),
            vec![
                EntityMember::new("Id", ShaperExpr::Projection(ProjectionBinding::new(0))),
                EntityMember::new("Orders", lowered_orders_shape()),
            ],
        )));

        let json = serde_json::to_value(explain_shaper(&entity)).expect("explain serializes");

        assert_eq!(json["Entity"]["element_type"], "Customer");
        let orders = &json["Entity"]["members"][1]["shape"]["CollectionArray"];
        assert_eq!(orders["id"], 0);
        assert_eq!(orders["navigation"], "Orders");
        assert_eq!(orders["element"]["Projection"]["index"], 0);
    }
}
