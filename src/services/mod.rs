//! Business logic services

pub mod codes;
pub mod health;
pub mod monitor;
pub mod terminals;

use std::sync::Arc;

use crate::{
    config::MonitoringConfig,
    error::{AppError, AppResult},
    models::store::Store,
    repository::TerminalRepository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Arc<dyn TerminalRepository>,
    pub terminals: terminals::TerminalsService,
    pub codes: codes::CodeGenerator,
    pub health: health::HealthService,
}

impl Services {
    /// Create all services on top of the given repository
    pub fn new(repository: Arc<dyn TerminalRepository>, monitoring: MonitoringConfig) -> Self {
        let codes = codes::CodeGenerator::new(repository.clone());
        Self {
            terminals: terminals::TerminalsService::new(repository.clone(), codes.clone()),
            health: health::HealthService::new(repository.clone(), monitoring),
            codes,
            repository,
        }
    }

    /// Background monitor sharing this container's health state
    pub fn health_monitor(&self) -> monitor::HealthMonitor {
        monitor::HealthMonitor::new(self.repository.clone(), self.health.clone())
    }
}

/// Fetch a store or fail with `NotFound`
pub(crate) async fn require_store(repository: &dyn TerminalRepository, store_id: i32) -> AppResult<Store> {
    repository
        .store_get_by_id(store_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Store {} not found", store_id)))
}
