//! DealCRM API Library
//!
//! HTTP surface over the entitlement engine: authentication, guard
//! middleware, and the plan/entitlement/usage routes.

pub mod auth;
pub mod config;
pub mod error;
pub mod guards;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
