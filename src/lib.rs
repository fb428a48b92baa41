pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod store;
