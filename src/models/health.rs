//! Derived health snapshots (never persisted)

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::enums::TerminalStatus;

pub const WARNING_MISSING_MACHINE_IDENTIFIER: &str = "Terminal has no machine identifier bound";
pub const WARNING_NO_HEARTBEAT: &str = "Terminal has never sent a heartbeat";

/// Health of a single terminal
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TerminalHealth {
    pub terminal_id: i32,
    pub code: String,
    pub name: Option<String>,
    pub status: TerminalStatus,
    pub is_online: bool,
    pub is_active: bool,
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Age of the last heartbeat at evaluation time
    pub seconds_since_heartbeat: Option<i64>,
    pub warnings: Vec<String>,
}

/// Aggregate health of one store
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoreHealthSummary {
    pub store_id: i32,
    pub total_terminals: usize,
    pub online_terminals: usize,
    pub offline_terminals: usize,
    pub inactive_terminals: usize,
    /// Records that could not be evaluated
    pub unknown_terminals: usize,
    /// Percentage of active terminals that are online, two decimals
    pub health_percentage: f64,
    pub evaluated_at: DateTime<Utc>,
}

impl StoreHealthSummary {
    pub fn from_snapshots(
        store_id: i32,
        snapshots: &[TerminalHealth],
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        let count = |status: TerminalStatus| snapshots.iter().filter(|s| s.status == status).count();

        let total_terminals = snapshots.len();
        let online_terminals = count(TerminalStatus::Online);
        let offline_terminals = count(TerminalStatus::Offline);
        let inactive_terminals = count(TerminalStatus::Inactive);
        let unknown_terminals = count(TerminalStatus::Unknown);

        Self {
            store_id,
            total_terminals,
            online_terminals,
            offline_terminals,
            inactive_terminals,
            unknown_terminals,
            health_percentage: health_percentage(
                online_terminals,
                total_terminals - inactive_terminals,
            ),
            evaluated_at,
        }
    }
}

/// `online / active * 100`, rounded to two decimals; 0 without active terminals
pub fn health_percentage(online: usize, active: usize) -> f64 {
    if active == 0 {
        return 0.0;
    }
    let pct = online as f64 / active as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

/// Timestamp of the most recent health check run
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LastCheckResponse {
    pub last_check_time: Option<DateTime<Utc>>,
}

/// Result of a forced health check
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthCheckRun {
    pub store_id: i32,
    pub terminals_evaluated: usize,
    pub checked_at: DateTime<Utc>,
}
