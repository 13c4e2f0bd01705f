//! Convenience result type alias for Toolhub.

use crate::error::AppError;

/// A specialized `Result` type for Toolhub operations.
pub type AppResult<T> = Result<T, AppError>;
