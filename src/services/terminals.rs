//! Terminal registry and heartbeat tracking

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use super::{
    codes::{normalize_code, CodeGenerator},
    require_store,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::MachineIdentifierType,
        machine_id,
        terminal::{BindMachine, CreateTerminal, Heartbeat, NewTerminal, Terminal},
        TerminalEntry,
    },
    repository::TerminalRepository,
};

#[derive(Clone)]
pub struct TerminalsService {
    repository: Arc<dyn TerminalRepository>,
    codes: CodeGenerator,
}

impl TerminalsService {
    pub fn new(repository: Arc<dyn TerminalRepository>, codes: CodeGenerator) -> Self {
        Self { repository, codes }
    }

    /// Register a terminal that is talking to us right now.
    ///
    /// The registration counts as the first heartbeat, so the terminal is
    /// immediately online.
    pub async fn register_terminal(&self, data: CreateTerminal, user_id: i32) -> AppResult<Terminal> {
        let terminal = self.insert(data, user_id, true).await?;
        tracing::info!(
            "Terminal {} ({}) registered in store {} by user {}",
            terminal.code,
            terminal.id,
            terminal.store_id,
            user_id
        );
        Ok(terminal)
    }

    /// Create a terminal ahead of its first connection; it stays offline
    /// until it sends a heartbeat.
    pub async fn create_terminal(&self, data: CreateTerminal, user_id: i32) -> AppResult<Terminal> {
        let terminal = self.insert(data, user_id, false).await?;
        tracing::info!(
            "Terminal {} ({}) created in store {} by user {}",
            terminal.code,
            terminal.id,
            terminal.store_id,
            user_id
        );
        Ok(terminal)
    }

    pub async fn get_terminal_by_id(&self, id: i32) -> AppResult<Option<Terminal>> {
        self.repository.terminal_get_by_id(id).await
    }

    pub async fn list_store_terminals(&self, store_id: i32) -> AppResult<Vec<TerminalEntry>> {
        require_store(self.repository.as_ref(), store_id).await?;
        self.repository.terminal_list_by_store(store_id).await
    }

    /// Overwrite the printer and hardware configuration blobs. Their content
    /// is not inspected here.
    pub async fn update_configuration(
        &self,
        id: i32,
        printer_configuration: Option<String>,
        hardware_configuration: Option<String>,
        user_id: i32,
    ) -> AppResult<Terminal> {
        let terminal = self
            .repository
            .terminal_update_configuration(
                id,
                printer_configuration,
                hardware_configuration,
                user_id,
                Utc::now(),
            )
            .await?;
        tracing::info!("Configuration of terminal {} updated by user {}", id, user_id);
        Ok(terminal)
    }

    pub async fn bind_machine(&self, id: i32, data: BindMachine, user_id: i32) -> AppResult<Terminal> {
        let identifier = machine_id::normalize(&data.machine_identifier, data.machine_identifier_type)?;
        let terminal = self
            .repository
            .terminal_set_machine(
                id,
                Some((identifier, data.machine_identifier_type)),
                user_id,
                Utc::now(),
            )
            .await?;
        tracing::info!(
            "Terminal {} bound to machine {:?} by user {}",
            id,
            terminal.machine_identifier,
            user_id
        );
        Ok(terminal)
    }

    pub async fn unbind_machine(&self, id: i32, user_id: i32) -> AppResult<Terminal> {
        let terminal = self
            .repository
            .terminal_set_machine(id, None, user_id, Utc::now())
            .await?;
        tracing::info!("Terminal {} unbound from its machine by user {}", id, user_id);
        Ok(terminal)
    }

    /// Retire a terminal. Deactivating an inactive terminal is a no-op.
    pub async fn deactivate_terminal(&self, id: i32, user_id: i32) -> AppResult<Terminal> {
        let current = self
            .repository
            .terminal_get_by_id(id)
            .await?
            .ok_or_else(|| AppError::terminal_not_found(id))?;
        if !current.is_active() {
            return Ok(current);
        }

        let terminal = self
            .repository
            .terminal_deactivate(id, user_id, Utc::now())
            .await?;
        tracing::info!("Terminal {} ({}) deactivated by user {}", terminal.code, id, user_id);
        Ok(terminal)
    }

    /// Record a heartbeat: last-seen becomes now, IP and current user are
    /// replaced. The lifecycle is left untouched.
    pub async fn update_heartbeat(&self, terminal_id: i32, heartbeat: Heartbeat) -> AppResult<Terminal> {
        let ip_address = parse_ip(&heartbeat.ip_address)?;
        let terminal = self
            .repository
            .terminal_record_heartbeat(terminal_id, &ip_address, heartbeat.current_user_id, Utc::now())
            .await?;
        tracing::debug!("Heartbeat from terminal {} at {}", terminal_id, ip_address);
        Ok(terminal)
    }

    async fn insert(&self, data: CreateTerminal, user_id: i32, stamp_heartbeat: bool) -> AppResult<Terminal> {
        data.validate()?;
        require_store(self.repository.as_ref(), data.store_id).await?;

        let name = data.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Terminal name is required".to_string()));
        }

        let machine_identifier = match (&data.machine_identifier, data.machine_identifier_type) {
            (Some(value), Some(kind)) => Some(machine_id::normalize(value, kind)?),
            (Some(_), None) => {
                return Err(AppError::Validation(
                    "machine_identifier_type is required with a machine identifier".to_string(),
                ))
            }
            // Machines exposing neither a MAC nor a GUID get a generated identifier
            (None, Some(MachineIdentifierType::Generated)) => Some(machine_id::generate_fallback(
                &uuid::Uuid::new_v4().to_string(),
            )),
            (None, _) => None,
        };
        if machine_identifier.is_none() {
            tracing::warn!(
                "Terminal '{}' in store {} created without a machine identifier",
                name,
                data.store_id
            );
        }

        let ip_address = data.ip_address.as_deref().map(parse_ip).transpose()?;
        let now = Utc::now();

        let mut new_terminal = NewTerminal {
            store_id: data.store_id,
            code: String::new(),
            name,
            terminal_type: data.terminal_type,
            business_mode: data.business_mode,
            machine_identifier_type: machine_identifier.as_ref().and(data.machine_identifier_type),
            machine_identifier,
            ip_address,
            last_heartbeat: stamp_heartbeat.then_some(now),
            printer_configuration: data.printer_configuration,
            hardware_configuration: data.hardware_configuration,
            created_by: user_id,
            created_at: now,
        };

        match data.code.as_deref() {
            Some(code) => {
                new_terminal.code = normalize_code(code)?;
                if self
                    .repository
                    .terminal_code_exists(new_terminal.store_id, &new_terminal.code)
                    .await?
                {
                    return Err(AppError::Validation(format!(
                        "Terminal code {} is already in use in store {}",
                        new_terminal.code, new_terminal.store_id
                    )));
                }
                self.repository.terminal_create(&new_terminal).await
            }
            None => self.insert_with_generated_code(new_terminal).await,
        }
    }

    /// Generate a code and insert under the per-store/type lock. Another
    /// process may still win the race; the unique constraint then reports a
    /// concurrency error and we regenerate exactly once.
    async fn insert_with_generated_code(&self, mut new_terminal: NewTerminal) -> AppResult<Terminal> {
        let _guard = self
            .codes
            .lock(new_terminal.store_id, new_terminal.terminal_type)
            .await;

        new_terminal.code = self
            .codes
            .generate_terminal_code(new_terminal.store_id, new_terminal.terminal_type)
            .await?;

        match self.repository.terminal_create(&new_terminal).await {
            Err(e) if e.is_concurrency() => {
                tracing::warn!(
                    "Terminal code {} was taken concurrently in store {}, regenerating",
                    new_terminal.code,
                    new_terminal.store_id
                );
                new_terminal.code = self
                    .codes
                    .generate_terminal_code(new_terminal.store_id, new_terminal.terminal_type)
                    .await?;
                self.repository.terminal_create(&new_terminal).await
            }
            result => result,
        }
    }
}

fn parse_ip(value: &str) -> AppResult<String> {
    value
        .trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| AppError::Validation(format!("Invalid IP address: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        enums::{BusinessMode, TerminalLifecycle, TerminalType},
        store::Store,
    };
    use crate::repository::MockTerminalRepository;

    fn request(code: Option<&str>) -> CreateTerminal {
        CreateTerminal {
            store_id: 1,
            code: code.map(str::to_string),
            name: "Front register".to_string(),
            terminal_type: TerminalType::Register,
            business_mode: BusinessMode::Supermarket,
            machine_identifier: None,
            machine_identifier_type: None,
            ip_address: None,
            printer_configuration: None,
            hardware_configuration: None,
        }
    }

    fn created(data: &NewTerminal, id: i32) -> Terminal {
        Terminal {
            id,
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
        }
    }

    fn with_store(repo: &mut MockTerminalRepository) {
        repo.expect_store_get_by_id().returning(|id| {
            Ok(Some(Store {
                id,
                name: "Westlands".to_string(),
                is_active: true,
            }))
        });
    }

    fn service(repo: MockTerminalRepository) -> TerminalsService {
        let repo: Arc<dyn TerminalRepository> = Arc::new(repo);
        TerminalsService::new(repo.clone(), CodeGenerator::new(repo))
    }

    #[tokio::test]
    async fn test_generated_code_retries_once_after_race() {
        let mut repo = MockTerminalRepository::new();
        with_store(&mut repo);

        // First lookup sees REG-001, the retry sees REG-002 inserted by another node
        let mut lookups = 0;
        repo.expect_terminal_codes_with_prefix().times(2).returning(move |_, _| {
            lookups += 1;
            Ok((1..=lookups).map(|n| format!("REG-{:03}", n)).collect())
        });
        let mut inserts = 0;
        repo.expect_terminal_create().times(2).returning(move |data| {
            inserts += 1;
            if inserts == 1 {
                Err(AppError::Concurrency("terminals_store_code_key".to_string()))
            } else {
                Ok(created(data, 10))
            }
        });

        let terminal = service(repo).create_terminal(request(None), 5).await.unwrap();
        assert_eq!(terminal.code, "REG-003");
    }

    #[tokio::test]
    async fn test_second_race_surfaces_concurrency_error() {
        let mut repo = MockTerminalRepository::new();
        with_store(&mut repo);
        repo.expect_terminal_codes_with_prefix()
            .times(2)
            .returning(|_, _| Ok(Vec::new()));
        repo.expect_terminal_create()
            .times(2)
            .returning(|_| Err(AppError::Concurrency("terminals_store_code_key".to_string())));

        let err = service(repo).create_terminal(request(None), 5).await.unwrap_err();
        assert!(err.is_concurrency());
    }

    #[tokio::test]
    async fn test_duplicate_explicit_code_is_a_validation_error() {
        let mut repo = MockTerminalRepository::new();
        with_store(&mut repo);
        repo.expect_terminal_code_exists().returning(|_, _| Ok(true));
        repo.expect_terminal_create().never();

        let err = service(repo)
            .register_terminal(request(Some("reg-001")), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("REG-001")));
    }

    #[tokio::test]
    async fn test_unknown_store_is_not_found() {
        let mut repo = MockTerminalRepository::new();
        repo.expect_store_get_by_id().returning(|_| Ok(None));

        let err = service(repo).create_terminal(request(None), 5).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg.contains("Store 1")));
    }

    #[tokio::test]
    async fn test_machine_identifier_needs_a_type() {
        let mut repo = MockTerminalRepository::new();
        with_store(&mut repo);

        let mut data = request(Some("REG-009"));
        data.machine_identifier = Some("AA:BB:CC:DD:EE:FF".to_string());
        let err = service(repo).create_terminal(data, 5).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_malformed_mac_is_rejected() {
        let mut repo = MockTerminalRepository::new();
        with_store(&mut repo);

        let mut data = request(Some("REG-009"));
        data.machine_identifier = Some("AA:BB".to_string());
        data.machine_identifier_type = Some(MachineIdentifierType::MacAddress);
        let err = service(repo).register_terminal(data, 5).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("MAC")));
    }

    #[tokio::test]
    async fn test_generated_identifier_is_assigned_when_missing() {
        let mut repo = MockTerminalRepository::new();
        with_store(&mut repo);
        repo.expect_terminal_code_exists().returning(|_, _| Ok(false));
        repo.expect_terminal_create().returning(|data| Ok(created(data, 4)));

        let mut data = request(Some("MOB-001"));
        data.machine_identifier_type = Some(MachineIdentifierType::Generated);
        let terminal = service(repo).create_terminal(data, 5).await.unwrap();

        let identifier = terminal.machine_identifier.unwrap();
        assert!(identifier.starts_with("GEN-"));
        assert_eq!(terminal.machine_identifier_type, Some(MachineIdentifierType::Generated));
    }

    #[tokio::test]
    async fn test_heartbeat_rejects_bad_ip() {
        let mut repo = MockTerminalRepository::new();
        repo.expect_terminal_record_heartbeat().never();

        let err = service(repo)
            .update_heartbeat(
                3,
                Heartbeat {
                    ip_address: "10.0.0.300".to_string(),
                    current_user_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
