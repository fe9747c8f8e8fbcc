//! # UShare API
//! 
//! HTTP handlers, middleware, DTOs, and validators.

pub mod handlers;
pub mod middleware;
pub mod dto;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;
pub mod validation;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
