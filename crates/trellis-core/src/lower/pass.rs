//! The collection-lowering pass: rewrites every logical collection shape
//! into a physical collection-array shape backed by a correlated array
//! subquery, augmenting the owning query structure in place.

use crate::{
    obs::{DiagnosticsSink, SilentSink},
    shape::{CollectionId, CollectionShape, EntityMember, ShapedQuery, ShaperExpr},
    sql::SelectQuery,
};
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// SplitBehavior
///
/// The caller's explicit query-splitting preference. When absent, the
/// conversion path records the implicit single-query choice through the
/// diagnostics sink; compilation proceeds either way.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SplitBehavior {
    SingleQuery,
    SplitQuery,
}

///
/// LoweringContext
///
/// Configuration the conversion call path needs from the pass: the
/// caller's splitting preference and the sink that makes an implicit
/// choice observable.
///

#[derive(Clone, Copy)]
pub struct LoweringContext<'d> {
    pub splitting: Option<SplitBehavior>,
    pub sink: &'d dyn DiagnosticsSink,
}

///
/// LowerError
///
/// Structural lowering failure. Terminal for the whole pass: no partial
/// shape tree is ever returned, and whether to abort or fall back to a
/// non-array strategy is the calling pipeline's policy.
///

#[derive(Debug, ThisError)]
pub enum LowerError {
    #[error(
        "collection at projection slot {index} is not convertible to an array subquery (navigation: {})",
        navigation.as_deref().unwrap_or("<anonymous>")
    )]
    CollectionNotConvertible {
        index: usize,
        navigation: Option<String>,
    },
}

///
/// CollectionLoweringPass
///
/// Single-use rewrite pass. The collection id counter starts at 0 and is
/// never reset; `lower` consumes the pass, so reuse across independent
/// compilations is unrepresentable. Construct a fresh pass per compiled
/// query.
///

pub struct CollectionLoweringPass<'d> {
    next_id: u32,
    ctx: LoweringContext<'d>,
}

impl CollectionLoweringPass<'static> {
    #[must_use]
    pub fn new(splitting: Option<SplitBehavior>) -> Self {
        Self {
            next_id: 0,
            ctx: LoweringContext {
                splitting,
                sink: &SilentSink,
            },
        }
    }
}

impl<'d> CollectionLoweringPass<'d> {
    #[must_use]
    pub fn with_sink(splitting: Option<SplitBehavior>, sink: &'d dyn DiagnosticsSink) -> Self {
        Self {
            next_id: 0,
            ctx: LoweringContext { splitting, sink },
        }
    }

    /// Lower every logical collection shape in `shaped`.
    ///
    /// On success the returned shaper contains only physical collection
    /// nodes and the query structure carries the matching array
    /// subqueries, indexed so every binding still resolves. On failure
    /// the whole pass fails; nothing partial is observable.
    pub fn lower(mut self, shaped: ShapedQuery) -> Result<ShapedQuery, LowerError> {
        let (mut query, shaper) = shaped.into_parts();
        let lowered = self.visit(&shaper, &mut query)?;

        Ok(ShapedQuery::new(query, lowered))
    }

    fn next_collection_id(&mut self) -> CollectionId {
        let id = CollectionId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Depth-first rewrite of one shaper against its owning query.
    fn visit(
        &mut self,
        shaper: &ShaperExpr,
        query: &mut SelectQuery,
    ) -> Result<ShaperExpr, LowerError> {
        match shaper {
            ShaperExpr::Projection(_) => Ok(shaper.clone()),

            // Physical collection nodes are outputs of this pass; their
            // element shapers are already lowered.
            ShaperExpr::CollectionArray(_) => Ok(shaper.clone()),

            ShaperExpr::Entity(entity) => {
                let mut changed = false;
                let mut members = Vec::with_capacity(entity.members().len());
                for member in entity.members() {
                    let lowered = self.visit(&member.shaper, query)?;
                    changed |= !ShaperExpr::same_node(&lowered, &member.shaper);
                    members.push(EntityMember::new(member.name.clone(), lowered));
                }

                if changed {
                    Ok(ShaperExpr::Entity(entity.update(members)))
                } else {
                    Ok(shaper.clone())
                }
            }

            ShaperExpr::Collection(shape) => self.lower_collection(shape, query),

            // A nested shaped query is lowered through its shaper only,
            // against its own query structure; this pass never wanders
            // into the rest of that query.
            ShaperExpr::ShapedQuery(shaped) => {
                let mut nested_query = shaped.query().clone();
                let lowered = self.visit(shaped.shaper(), &mut nested_query)?;

                if ShaperExpr::same_node(&lowered, shaped.shaper()) {
                    // No conversion ran, so the cloned query is untouched.
                    Ok(shaper.clone())
                } else {
                    Ok(ShaperExpr::ShapedQuery(Arc::new(ShapedQuery::new(
                        nested_query,
                        lowered,
                    ))))
                }
            }
        }
    }

    fn lower_collection(
        &mut self,
        shape: &CollectionShape,
        query: &mut SelectQuery,
    ) -> Result<ShaperExpr, LowerError> {
        let index = shape.binding().index();

        // Resolve the binding to the pending correlated row source first:
        // the element shaper's own bindings address that sub-plan, not the
        // outer projection.
        let inner_query = query
            .collection_source_mut(index)
            .ok_or_else(|| not_convertible(shape))?;

        let element_shaper = self.visit(shape.element_shaper(), inner_query)?;

        // The id is assigned only after the element shaper is fully
        // lowered: inner collections sort strictly before their outer
        // collection, siblings keep input order.
        let collection_id = self.next_collection_id();

        query
            .apply_collection_array(
                index,
                collection_id,
                element_shaper,
                shape.navigation().cloned(),
                shape.element_type().clone(),
                self.ctx,
            )
            .map(|physical| ShaperExpr::CollectionArray(Arc::new(physical)))
            .ok_or_else(|| not_convertible(shape))
    }
}

fn not_convertible(shape: &CollectionShape) -> LowerError {
    LowerError::CollectionNotConvertible {
        index: shape.binding().index(),
        navigation: shape.navigation().map(|nav| nav.name().to_string()),
    }
}
