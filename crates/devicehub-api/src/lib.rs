//! # devicehub-api
//!
//! Session gateway for DeviceHub built on Axum.
//!
//! Translates authenticated HTTP requests and live channel frames into
//! device session manager calls and connection registry events. Holds no
//! policy of its own beyond binding operations to the caller's identity.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
