//! Trellis: collection-to-array lowering for relational query compilers.
//!
//! ## Crate layout
//! - `core`: expression node model, shape tree, lowering pass, and
//!   observability boundary.
//!
//! The `prelude` module mirrors the surface a compilation pipeline uses
//! when driving one lowering pass.

pub use trellis_core as core;

pub use trellis_core::Error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Pipeline Prelude
///

pub mod prelude {
    pub use trellis_core::{
        obs::{DiagnosticEvent, DiagnosticsSink, SilentSink},
        prelude::*,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn prelude_drives_a_whole_lowering_pass() {
        let mut orders = SelectQuery::new("orders");
        orders.push_scalar(SqlExpr::column("id", SqlType::Int));

        let mut customers = SelectQuery::new("customers");
        let binding = customers.push_collection(orders);

        let shaped = ShapedQuery::new(
            customers,
            ShaperExpr::Collection(std::sync::Arc::new(CollectionShape::new(
                binding,
                ShaperExpr::Projection(ProjectionBinding::new(0)),
                Some(Navigation::new("Orders")),
                TypeRef::new("Order"),
            ))),
        );

        let lowered = CollectionLoweringPass::new(Some(SplitBehavior::SingleQuery))
            .lower(shaped)
            .expect("single collection lowers");

        match lowered.shaper() {
            ShaperExpr::CollectionArray(shape) => {
                assert_eq!(shape.collection_id(), CollectionId::new(0));
            }
            other => panic!("expected collection array shape, got {other:?}"),
        }
    }
}
