pub mod config;
pub mod models;
pub mod service;

pub use config::Config;
pub use models::*;
pub use service::{AppState, build_router, create_app, spawn_session_sweeper};
