//! Tillwatch POS terminal monitoring
//!
//! Keeps the registry of point-of-sale terminals for every store, tracks
//! their heartbeats and reports per-terminal and per-store health over a
//! REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
