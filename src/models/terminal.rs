//! Terminal model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::{
    BusinessMode, MachineIdentifierType, TerminalLifecycle, TerminalType, UnknownDiscriminant,
};

/// Terminal record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Terminal {
    pub id: i32,
    pub store_id: i32,
    /// Human readable code, unique within the store (e.g. "REG-001")
    pub code: String,
    pub name: String,
    pub terminal_type: TerminalType,
    pub business_mode: BusinessMode,
    pub machine_identifier: Option<String>,
    pub machine_identifier_type: Option<MachineIdentifierType>,
    pub ip_address: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub current_user_id: Option<i32>,
    pub lifecycle: TerminalLifecycle,
    /// Opaque printer configuration, owned by the printing module
    pub printer_configuration: Option<String>,
    /// Opaque hardware configuration, owned by the device module
    pub hardware_configuration: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<i32>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Terminal {
    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    pub fn has_machine_identifier(&self) -> bool {
        self.machine_identifier
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

/// Raw `terminals` row as stored in Postgres
#[derive(Debug, Clone, FromRow)]
pub struct TerminalRow {
    pub id: i32,
    pub store_id: i32,
    pub code: String,
    pub name: String,
    pub terminal_type: i16,
    pub business_mode: i16,
    pub machine_identifier: Option<String>,
    pub machine_identifier_type: Option<i16>,
    pub ip_address: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub current_user_id: Option<i32>,
    pub is_active: bool,
    pub printer_configuration: Option<String>,
    pub hardware_configuration: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<i32>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<TerminalRow> for Terminal {
    type Error = UnknownDiscriminant;

    fn try_from(row: TerminalRow) -> Result<Self, Self::Error> {
        Ok(Terminal {
            id: row.id,
            store_id: row.store_id,
            code: row.code,
            name: row.name,
            terminal_type: TerminalType::try_from(row.terminal_type)?,
            business_mode: BusinessMode::try_from(row.business_mode)?,
            machine_identifier: row.machine_identifier,
            machine_identifier_type: row
                .machine_identifier_type
                .map(MachineIdentifierType::try_from)
                .transpose()?,
            ip_address: row.ip_address,
            last_heartbeat: row.last_heartbeat,
            current_user_id: row.current_user_id,
            lifecycle: TerminalLifecycle::from(row.is_active),
            printer_configuration: row.printer_configuration,
            hardware_configuration: row.hardware_configuration,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        })
    }
}

/// A stored terminal that could not be turned into a [`Terminal`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndecodableTerminal {
    pub id: i32,
    pub code: String,
    pub reason: String,
}

/// One entry of a store listing: either a usable terminal or a broken record
pub type TerminalEntry = Result<Terminal, UndecodableTerminal>;

impl TerminalRow {
    pub fn into_entry(self) -> TerminalEntry {
        let id = self.id;
        let code = self.code.clone();
        Terminal::try_from(self).map_err(|e| UndecodableTerminal {
            id,
            code,
            reason: e.to_string(),
        })
    }
}

/// Register / create terminal request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTerminal {
    pub store_id: i32,
    /// Leave empty to have a code generated from the terminal type
    #[validate(length(min = 1, max = 32, message = "Code must be 1 to 32 characters"))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,
    pub terminal_type: TerminalType,
    pub business_mode: BusinessMode,
    #[validate(length(min = 1, max = 128, message = "Machine identifier must be 1 to 128 characters"))]
    pub machine_identifier: Option<String>,
    pub machine_identifier_type: Option<MachineIdentifierType>,
    pub ip_address: Option<String>,
    pub printer_configuration: Option<String>,
    pub hardware_configuration: Option<String>,
}

/// Fully validated insert, built by the terminal service
#[derive(Debug, Clone)]
pub struct NewTerminal {
    pub store_id: i32,
    pub code: String,
    pub name: String,
    pub terminal_type: TerminalType,
    pub business_mode: BusinessMode,
    pub machine_identifier: Option<String>,
    pub machine_identifier_type: Option<MachineIdentifierType>,
    pub ip_address: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub printer_configuration: Option<String>,
    pub hardware_configuration: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
}

/// Update configuration request. Both blobs are overwritten.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateConfiguration {
    pub printer_configuration: Option<String>,
    pub hardware_configuration: Option<String>,
}

/// Bind machine request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BindMachine {
    pub machine_identifier: String,
    pub machine_identifier_type: MachineIdentifierType,
}

/// Heartbeat sent periodically by every terminal
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct Heartbeat {
    pub ip_address: String,
    pub current_user_id: Option<i32>,
}
