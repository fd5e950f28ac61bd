//! HTTP surface of the relay

pub mod errors;
pub mod handlers;
pub mod server;

pub use errors::{ApiError, ApiResult};
pub use server::{create_router, serve, AppState};
