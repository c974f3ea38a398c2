//! Collection-lowering wiring; must not implement node types.

mod pass;
mod validate;

pub use pass::{CollectionLoweringPass, LowerError, LoweringContext, SplitBehavior};
pub use validate::{ValidateError, validate_lowered};
