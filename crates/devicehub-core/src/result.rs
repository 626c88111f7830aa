//! Convenience result type alias for DeviceHub.

use crate::error::AppError;

/// A specialized `Result` type for DeviceHub operations.
pub type AppResult<T> = Result<T, AppError>;
