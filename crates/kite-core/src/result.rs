//! Convenience result type alias for Kite.

use crate::error::AppError;

/// A specialized `Result` type for Kite infrastructure operations.
pub type AppResult<T> = Result<T, AppError>;
