//! Post-lowering structural validation; must not rewrite.
//!
//! The pass already fails hard on unconvertible collections; this module
//! is the independent check a pipeline runs before trusting a lowered
//! tree — no logical shape survived, no pending slot was left behind,
//! every binding resolves, and collection ids are unique.

use crate::{
    shape::{CollectionId, ShapedQuery, ShaperExpr},
    sql::{ProjectionSlot, SelectQuery, SqlExpr},
};
use std::collections::BTreeSet;
use thiserror::Error as ThisError;

///
/// ValidateError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum ValidateError {
    #[error("logical collection shape survived lowering at projection slot {index}")]
    LogicalShapeSurvived { index: usize },

    #[error("pending collection source was never lowered: slot {index} of '{src}'")]
    PendingSlotSurvived { index: usize, src: String },

    #[error("projection binding out of range: slot {index}, projection width {width}")]
    BindingOutOfRange { index: usize, width: usize },

    #[error("duplicate collection id {id}")]
    DuplicateCollectionId { id: CollectionId },
}

/// Check one lowered shaped query end to end.
pub fn validate_lowered(shaped: &ShapedQuery) -> Result<(), ValidateError> {
    let mut seen = BTreeSet::new();

    validate_query(shaped.query())?;
    validate_shaper(shaped.shaper(), addressable_width(shaped.query()), &mut seen)
}

fn validate_query(query: &SelectQuery) -> Result<(), ValidateError> {
    for (index, slot) in query.projection().iter().enumerate() {
        match slot {
            ProjectionSlot::Collection(_) => {
                return Err(ValidateError::PendingSlotSurvived {
                    index,
                    src: query.source().to_string(),
                });
            }
            ProjectionSlot::Scalar(expr) => validate_expr(expr)?,
        }
    }

    Ok(())
}

// Array subqueries nest whole sub-plans; check those too.
fn validate_expr(expr: &SqlExpr) -> Result<(), ValidateError> {
    match expr {
        SqlExpr::Column(_) | SqlExpr::Literal(_) => Ok(()),
        SqlExpr::RowValue(row) => {
            for value in row.values() {
                validate_expr(value)?;
            }
            Ok(())
        }
        SqlExpr::ArraySubquery(array) => validate_query(array.subquery()),
    }
}

// Bindings address projection slots; once a sub-projection has been
// collapsed through a row constructor they address row positions instead.
fn addressable_width(query: &SelectQuery) -> usize {
    match query.single_scalar() {
        Some(SqlExpr::RowValue(row)) => row.values().len(),
        _ => query.projection().len(),
    }
}

fn validate_shaper(
    shaper: &ShaperExpr,
    width: usize,
    seen: &mut BTreeSet<CollectionId>,
) -> Result<(), ValidateError> {
    match shaper {
        ShaperExpr::Projection(binding) => {
            if binding.index() >= width {
                return Err(ValidateError::BindingOutOfRange {
                    index: binding.index(),
                    width,
                });
            }
            Ok(())
        }

        ShaperExpr::Entity(entity) => {
            for member in entity.members() {
                validate_shaper(&member.shaper, width, seen)?;
            }
            Ok(())
        }

        ShaperExpr::Collection(shape) => Err(ValidateError::LogicalShapeSurvived {
            index: shape.binding().index(),
        }),

        ShaperExpr::CollectionArray(shape) => {
            if shape.binding().index() >= width {
                return Err(ValidateError::BindingOutOfRange {
                    index: shape.binding().index(),
                    width,
                });
            }
            if !seen.insert(shape.collection_id()) {
                return Err(ValidateError::DuplicateCollectionId {
                    id: shape.collection_id(),
                });
            }

            // The element shaper addresses the array sub-plan.
            let sub_plan = shape.subquery().subquery();
            validate_shaper(shape.element_shaper(), addressable_width(sub_plan), seen)
        }

        ShaperExpr::ShapedQuery(shaped) => {
            validate_query(shaped.query())?;
            validate_shaper(shaped.shaper(), addressable_width(shaped.query()), seen)
        }
    }
}
