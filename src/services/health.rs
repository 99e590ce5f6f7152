//! Terminal health evaluation

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::{
    config::MonitoringConfig,
    error::AppResult,
    models::{
        enums::TerminalStatus,
        health::{
            HealthCheckRun, StoreHealthSummary, TerminalHealth, WARNING_MISSING_MACHINE_IDENTIFIER,
            WARNING_NO_HEARTBEAT,
        },
        terminal::{Terminal, UndecodableTerminal},
    },
    repository::TerminalRepository,
};

/// Classify one terminal at instant `now`
pub fn evaluate(terminal: &Terminal, now: DateTime<Utc>, timeout: Duration) -> TerminalHealth {
    let age = terminal.last_heartbeat.map(|at| now - at);
    let fresh = age.is_some_and(|age| age <= timeout);
    let status = TerminalStatus::classify(terminal.lifecycle, fresh);

    let mut warnings = Vec::new();
    if !terminal.has_machine_identifier() {
        warnings.push(WARNING_MISSING_MACHINE_IDENTIFIER.to_string());
    }
    if terminal.is_active() && terminal.last_heartbeat.is_none() {
        warnings.push(WARNING_NO_HEARTBEAT.to_string());
    }

    TerminalHealth {
        terminal_id: terminal.id,
        code: terminal.code.clone(),
        name: Some(terminal.name.clone()),
        status,
        is_online: status == TerminalStatus::Online,
        is_active: terminal.is_active(),
        last_heartbeat: terminal.last_heartbeat,
        seconds_since_heartbeat: age.map(|age| age.num_seconds()),
        warnings,
    }
}

fn unknown(record: &UndecodableTerminal) -> TerminalHealth {
    TerminalHealth {
        terminal_id: record.id,
        code: record.code.clone(),
        name: None,
        status: TerminalStatus::Unknown,
        is_online: false,
        is_active: false,
        last_heartbeat: None,
        seconds_since_heartbeat: None,
        warnings: vec![format!("Terminal record could not be evaluated: {}", record.reason)],
    }
}

#[derive(Clone)]
pub struct HealthService {
    repository: Arc<dyn TerminalRepository>,
    monitoring: MonitoringConfig,
    last_check: Arc<RwLock<Option<DateTime<Utc>>>>,
    /// Status seen by the previous health check, per terminal
    last_statuses: Arc<DashMap<i32, TerminalStatus>>,
}

impl HealthService {
    pub fn new(repository: Arc<dyn TerminalRepository>, monitoring: MonitoringConfig) -> Self {
        Self {
            repository,
            monitoring,
            last_check: Arc::new(RwLock::new(None)),
            last_statuses: Arc::new(DashMap::new()),
        }
    }

    pub fn monitoring(&self) -> &MonitoringConfig {
        &self.monitoring
    }

    /// Snapshot of one terminal; an undecodable record is reported as `Unknown`
    pub async fn get_terminal_health(&self, terminal_id: i32) -> AppResult<Option<TerminalHealth>> {
        let entry = self.repository.terminal_entry_by_id(terminal_id).await?;
        let timeout = self.monitoring.heartbeat_timeout();
        Ok(entry.map(|entry| match entry {
            Ok(terminal) => evaluate(&terminal, Utc::now(), timeout),
            Err(record) => {
                tracing::warn!(
                    "Terminal {} ({}) could not be evaluated: {}",
                    record.code,
                    record.id,
                    record.reason
                );
                unknown(&record)
            }
        }))
    }

    /// Snapshot of every terminal in the store. Records that cannot be
    /// decoded are reported as `Unknown` instead of failing the listing.
    pub async fn get_store_terminal_health(&self, store_id: i32) -> AppResult<Vec<TerminalHealth>> {
        super::require_store(self.repository.as_ref(), store_id).await?;
        let entries = self.repository.terminal_list_by_store(store_id).await?;
        let now = Utc::now();
        let timeout = self.monitoring.heartbeat_timeout();

        Ok(entries
            .iter()
            .map(|entry| match entry {
                Ok(terminal) => evaluate(terminal, now, timeout),
                Err(record) => {
                    tracing::warn!(
                        "Terminal {} ({}) in store {} could not be evaluated: {}",
                        record.code,
                        record.id,
                        store_id,
                        record.reason
                    );
                    unknown(record)
                }
            })
            .collect())
    }

    pub async fn get_store_health_summary(&self, store_id: i32) -> AppResult<StoreHealthSummary> {
        let snapshots = self.get_store_terminal_health(store_id).await?;
        Ok(StoreHealthSummary::from_snapshots(store_id, &snapshots, Utc::now()))
    }

    /// Re-evaluate every terminal of the store and remember when it happened
    pub async fn run_health_check_now(&self, store_id: i32) -> AppResult<HealthCheckRun> {
        let snapshots = self.get_store_terminal_health(store_id).await?;

        for snapshot in &snapshots {
            let previous = self.last_statuses.insert(snapshot.terminal_id, snapshot.status);
            if self.monitoring.log_status_changes {
                log_transition(store_id, snapshot, previous);
            }
        }

        let checked_at = Utc::now();
        *self.last_check.write().await = Some(checked_at);

        let summary = StoreHealthSummary::from_snapshots(store_id, &snapshots, checked_at);
        tracing::debug!(
            "Health check for store {}: {}/{} online, {} offline, {} inactive ({}%)",
            store_id,
            summary.online_terminals,
            summary.total_terminals,
            summary.offline_terminals,
            summary.inactive_terminals,
            summary.health_percentage
        );

        Ok(HealthCheckRun {
            store_id,
            terminals_evaluated: snapshots.len(),
            checked_at,
        })
    }

    pub async fn get_last_check_time(&self) -> Option<DateTime<Utc>> {
        *self.last_check.read().await
    }
}

fn log_transition(store_id: i32, snapshot: &TerminalHealth, previous: Option<TerminalStatus>) {
    let Some(previous) = previous else {
        return;
    };
    if previous == snapshot.status {
        return;
    }
    match snapshot.status {
        TerminalStatus::Offline | TerminalStatus::Unknown => tracing::warn!(
            "Terminal {} in store {} went {} (was {})",
            snapshot.code,
            store_id,
            snapshot.status,
            previous
        ),
        _ => tracing::info!(
            "Terminal {} in store {} is now {} (was {})",
            snapshot.code,
            store_id,
            snapshot.status,
            previous
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{
        enums::{BusinessMode, TerminalLifecycle, TerminalType},
        store::Store,
    };
    use crate::repository::MockTerminalRepository;

    fn with_store(repo: &mut MockTerminalRepository) {
        repo.expect_store_get_by_id().returning(|id| {
            Ok(Some(Store {
                id,
                name: "Westlands".to_string(),
                is_active: true,
            }))
        });
    }

    fn terminal(id: i32, last_heartbeat: Option<DateTime<Utc>>) -> Terminal {
        Terminal {
            id,
            store_id: 1,
            code: format!("TILL-{:03}", id),
            name: format!("Till {}", id),
            terminal_type: TerminalType::Till,
            business_mode: BusinessMode::Restaurant,
            machine_identifier: Some("AA:BB:CC:DD:EE:FF".to_string()),
            machine_identifier_type: None,
            ip_address: None,
            last_heartbeat,
            current_user_id: None,
            lifecycle: TerminalLifecycle::Active,
            printer_configuration: None,
            hardware_configuration: None,
            created_by: 1,
            created_at: Utc::now(),
            updated_by: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_timeout_boundary_is_inclusive() {
        let now = Utc::now();
        let timeout = Duration::seconds(60);

        let at_limit = evaluate(&terminal(1, Some(now - timeout)), now, timeout);
        assert_eq!(at_limit.status, TerminalStatus::Online);
        assert_eq!(at_limit.seconds_since_heartbeat, Some(60));

        let past_limit = evaluate(&terminal(1, Some(now - Duration::seconds(61))), now, timeout);
        assert_eq!(past_limit.status, TerminalStatus::Offline);
    }

    #[test]
    fn test_inactive_ignores_fresh_heartbeat() {
        let now = Utc::now();
        let mut t = terminal(2, Some(now));
        t.lifecycle = TerminalLifecycle::Inactive;

        let health = evaluate(&t, now, Duration::seconds(60));
        assert_eq!(health.status, TerminalStatus::Inactive);
        assert!(!health.is_active);
        assert!(!health.is_online);
        assert!(!health.warnings.iter().any(|w| w == WARNING_NO_HEARTBEAT));
    }

    #[test]
    fn test_never_seen_terminal_is_offline_with_warning() {
        let health = evaluate(&terminal(3, None), Utc::now(), Duration::seconds(60));
        assert_eq!(health.status, TerminalStatus::Offline);
        assert_eq!(health.seconds_since_heartbeat, None);
        assert!(health.warnings.iter().any(|w| w == WARNING_NO_HEARTBEAT));
    }

    #[tokio::test]
    async fn test_undecodable_record_is_unknown_and_does_not_abort() {
        let now = Utc::now();
        let mut repo = MockTerminalRepository::new();
        with_store(&mut repo);
        repo.expect_terminal_list_by_store().returning(move |_| {
            Ok(vec![
                Ok(terminal(1, Some(now))),
                Err(UndecodableTerminal {
                    id: 2,
                    code: "XXX-001".to_string(),
                    reason: "unknown terminal type value 42".to_string(),
                }),
                Ok(terminal(3, None)),
            ])
        });

        let service = HealthService::new(Arc::new(repo), MonitoringConfig::default());
        let summary = service.get_store_health_summary(1).await.unwrap();

        assert_eq!(summary.total_terminals, 3);
        assert_eq!(summary.online_terminals, 1);
        assert_eq!(summary.offline_terminals, 1);
        assert_eq!(summary.unknown_terminals, 1);
        assert_eq!(summary.health_percentage, 33.33);
    }

    #[tokio::test]
    async fn test_health_check_records_time_and_count() {
        let mut repo = MockTerminalRepository::new();
        with_store(&mut repo);
        repo.expect_terminal_list_by_store()
            .returning(|_| Ok(vec![Ok(terminal(1, None)), Ok(terminal(2, None))]));

        let service = HealthService::new(Arc::new(repo), MonitoringConfig::default());
        assert!(service.get_last_check_time().await.is_none());

        let run = service.run_health_check_now(1).await.unwrap();
        assert_eq!(run.terminals_evaluated, 2);
        assert_eq!(service.get_last_check_time().await, Some(run.checked_at));
        assert_eq!(
            service.last_statuses.get(&1).map(|s| *s),
            Some(TerminalStatus::Offline)
        );
    }

    #[tokio::test]
    async fn test_single_undecodable_terminal_is_unknown() {
        let mut repo = MockTerminalRepository::new();
        repo.expect_terminal_entry_by_id().returning(|id| {
            Ok(Some(Err(UndecodableTerminal {
                id,
                code: "XXX-004".to_string(),
                reason: "unknown business mode value 9".to_string(),
            })))
        });

        let service = HealthService::new(Arc::new(repo), MonitoringConfig::default());
        let health = service.get_terminal_health(4).await.unwrap().unwrap();

        assert_eq!(health.terminal_id, 4);
        assert_eq!(health.status, TerminalStatus::Unknown);
        assert!(!health.is_online);
        assert!(health.warnings[0].contains("unknown business mode value 9"));
    }

    #[tokio::test]
    async fn test_summary_of_unknown_store_is_not_found() {
        let mut repo = MockTerminalRepository::new();
        repo.expect_store_get_by_id().returning(|_| Ok(None));
        repo.expect_terminal_list_by_store().never();

        let service = HealthService::new(Arc::new(repo), MonitoringConfig::default());
        let err = service.get_store_health_summary(7).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg.contains("Store 7")));
    }
}
