//! Repository layer for terminal persistence

pub mod memory;
pub mod terminals;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        enums::MachineIdentifierType,
        store::Store,
        terminal::{NewTerminal, Terminal, TerminalEntry},
    },
};

pub use memory::MemoryRepository;

/// Storage operations needed by the terminal services.
///
/// Implementations must enforce uniqueness of `(store_id, code)` and report a
/// violation as [`AppError::Concurrency`](crate::error::AppError::Concurrency).
/// Mutations of a missing terminal fail with `NotFound`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TerminalRepository: Send + Sync {
    /// Connectivity probe used by the readiness endpoint
    async fn ping(&self) -> AppResult<()>;

    async fn store_get_by_id(&self, store_id: i32) -> AppResult<Option<Store>>;

    /// Ids of every store owning at least one terminal
    async fn store_ids_with_terminals(&self) -> AppResult<Vec<i32>>;

    async fn terminal_get_by_id(&self, id: i32) -> AppResult<Option<Terminal>>;

    /// Like `terminal_get_by_id`, but a record that cannot be decoded is
    /// returned as `Err(UndecodableTerminal)` instead of failing the call
    async fn terminal_entry_by_id(&self, id: i32) -> AppResult<Option<TerminalEntry>>;

    /// All terminals of a store, active and inactive, ordered by code
    async fn terminal_list_by_store(&self, store_id: i32) -> AppResult<Vec<TerminalEntry>>;

    async fn terminal_code_exists(&self, store_id: i32, code: &str) -> AppResult<bool>;

    /// Codes in the store starting with `{prefix}-`
    async fn terminal_codes_with_prefix(&self, store_id: i32, prefix: &str) -> AppResult<Vec<String>>;

    async fn terminal_create(&self, data: &NewTerminal) -> AppResult<Terminal>;

    async fn terminal_record_heartbeat(
        &self,
        id: i32,
        ip_address: &str,
        current_user_id: Option<i32>,
        at: DateTime<Utc>,
    ) -> AppResult<Terminal>;

    async fn terminal_update_configuration(
        &self,
        id: i32,
        printer_configuration: Option<String>,
        hardware_configuration: Option<String>,
        user_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Terminal>;

    /// Set or clear (`None`) the machine binding
    async fn terminal_set_machine(
        &self,
        id: i32,
        machine: Option<(String, MachineIdentifierType)>,
        user_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Terminal>;

    async fn terminal_deactivate(&self, id: i32, user_id: i32, at: DateTime<Utc>) -> AppResult<Terminal>;
}

/// Postgres backed repository
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}
