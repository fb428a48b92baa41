//! HTTP surface: request extraction, generic views and the router

mod error;
pub mod extract;
pub mod models;
mod server;
pub mod services;
pub mod state;
pub(crate) mod utils;

pub use error::ApiError;
pub use extract::ApiRequest;
pub use server::{router, run};
pub use state::AppState;
