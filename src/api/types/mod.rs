//! Wire types shared by the HTTP handlers

pub mod error;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
