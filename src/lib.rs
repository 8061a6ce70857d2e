pub mod admin;
pub mod app;
pub mod auth;
pub mod config;
pub mod posts;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod upsert;
pub mod users;
