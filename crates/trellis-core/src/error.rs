use crate::{
    lower::{LowerError, ValidateError},
    sql::ExprError,
};
use thiserror::Error as ThisError;

///
/// Error
///
/// Public integration error for the lowering core. Module errors stay
/// typed at their boundaries; this wrapper exists for callers that drive
/// the whole pipeline.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error(transparent)]
    Lower(#[from] LowerError),

    #[error(transparent)]
    Validate(#[from] ValidateError),
}
