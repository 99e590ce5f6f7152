//! In-memory repository for single-site deployments and tests

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::TerminalRepository;
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::{MachineIdentifierType, TerminalLifecycle},
        store::Store,
        terminal::{NewTerminal, Terminal, TerminalEntry},
    },
};

#[derive(Default)]
struct State {
    stores: BTreeMap<i32, Store>,
    terminals: BTreeMap<i32, Terminal>,
    next_id: i32,
}

impl State {
    fn terminal_mut(&mut self, id: i32) -> AppResult<&mut Terminal> {
        self.terminals
            .get_mut(&id)
            .ok_or_else(|| AppError::terminal_not_found(id))
    }
}

/// Keeps stores and terminals in process memory, with the same
/// `(store_id, code)` uniqueness rule as the `terminals` table.
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_store(&self, id: i32, name: &str) {
        self.state.write().await.stores.insert(
            id,
            Store {
                id,
                name: name.to_string(),
                is_active: true,
            },
        );
    }

    /// Overwrite a terminal's last heartbeat, e.g. when importing state
    pub async fn set_last_heartbeat(&self, id: i32, at: Option<DateTime<Utc>>) -> AppResult<()> {
        self.state.write().await.terminal_mut(id)?.last_heartbeat = at;
        Ok(())
    }
}

#[async_trait]
impl TerminalRepository for MemoryRepository {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn store_get_by_id(&self, store_id: i32) -> AppResult<Option<Store>> {
        Ok(self.state.read().await.stores.get(&store_id).cloned())
    }

    async fn store_ids_with_terminals(&self) -> AppResult<Vec<i32>> {
        let state = self.state.read().await;
        let mut ids: Vec<i32> = state.terminals.values().map(|t| t.store_id).collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn terminal_get_by_id(&self, id: i32) -> AppResult<Option<Terminal>> {
        Ok(self.state.read().await.terminals.get(&id).cloned())
    }

    async fn terminal_entry_by_id(&self, id: i32) -> AppResult<Option<TerminalEntry>> {
        Ok(self.state.read().await.terminals.get(&id).cloned().map(Ok))
    }

    async fn terminal_list_by_store(&self, store_id: i32) -> AppResult<Vec<TerminalEntry>> {
        let state = self.state.read().await;
        let mut terminals: Vec<Terminal> = state
            .terminals
            .values()
            .filter(|t| t.store_id == store_id)
            .cloned()
            .collect();
        terminals.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(terminals.into_iter().map(Ok).collect())
    }

    async fn terminal_code_exists(&self, store_id: i32, code: &str) -> AppResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .terminals
            .values()
            .any(|t| t.store_id == store_id && t.code == code))
    }

    async fn terminal_codes_with_prefix(&self, store_id: i32, prefix: &str) -> AppResult<Vec<String>> {
        let pattern = format!("{}-", prefix);
        let state = self.state.read().await;
        Ok(state
            .terminals
            .values()
            .filter(|t| t.store_id == store_id && t.code.starts_with(&pattern))
            .map(|t| t.code.clone())
            .collect())
    }

    async fn terminal_create(&self, data: &NewTerminal) -> AppResult<Terminal> {
        let mut state = self.state.write().await;
        if state
            .terminals
            .values()
            .any(|t| t.store_id == data.store_id && t.code == data.code)
        {
            return Err(AppError::Concurrency(format!(
                "unique constraint terminals_store_code_key violated for {}",
                data.code
            )));
        }

        state.next_id += 1;
        let terminal = Terminal {
            id: state.next_id,
            store_id: data.store_id,
            code: data.code.clone(),
            name: data.name.clone(),
            terminal_type: data.terminal_type,
            business_mode: data.business_mode,
            machine_identifier: data.machine_identifier.clone(),
            machine_identifier_type: data.machine_identifier_type,
            ip_address: data.ip_address.clone(),
            last_heartbeat: data.last_heartbeat,
            current_user_id: None,
            lifecycle: TerminalLifecycle::Active,
            printer_configuration: data.printer_configuration.clone(),
            hardware_configuration: data.hardware_configuration.clone(),
            created_by: data.created_by,
            created_at: data.created_at,
            updated_by: None,
            updated_at: None,
        };
        state.terminals.insert(terminal.id, terminal.clone());
        Ok(terminal)
    }

    async fn terminal_record_heartbeat(
        &self,
        id: i32,
        ip_address: &str,
        current_user_id: Option<i32>,
        at: DateTime<Utc>,
    ) -> AppResult<Terminal> {
        let mut state = self.state.write().await;
        let terminal = state.terminal_mut(id)?;
        terminal.last_heartbeat = Some(at);
        terminal.ip_address = Some(ip_address.to_string());
        terminal.current_user_id = current_user_id;
        Ok(terminal.clone())
    }

    async fn terminal_update_configuration(
        &self,
        id: i32,
        printer_configuration: Option<String>,
        hardware_configuration: Option<String>,
        user_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Terminal> {
        let mut state = self.state.write().await;
        let terminal = state.terminal_mut(id)?;
        terminal.printer_configuration = printer_configuration;
        terminal.hardware_configuration = hardware_configuration;
        terminal.updated_by = Some(user_id);
        terminal.updated_at = Some(at);
        Ok(terminal.clone())
    }

    async fn terminal_set_machine(
        &self,
        id: i32,
        machine: Option<(String, MachineIdentifierType)>,
        user_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Terminal> {
        let mut state = self.state.write().await;
        let terminal = state.terminal_mut(id)?;
        let (identifier, kind) = machine.unzip();
        terminal.machine_identifier = identifier;
        terminal.machine_identifier_type = kind;
        terminal.updated_by = Some(user_id);
        terminal.updated_at = Some(at);
        Ok(terminal.clone())
    }

    async fn terminal_deactivate(&self, id: i32, user_id: i32, at: DateTime<Utc>) -> AppResult<Terminal> {
        let mut state = self.state.write().await;
        let terminal = state.terminal_mut(id)?;
        terminal.lifecycle = TerminalLifecycle::Inactive;
        terminal.updated_by = Some(user_id);
        terminal.updated_at = Some(at);
        Ok(terminal.clone())
    }
}
