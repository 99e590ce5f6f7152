//! Terminal classification enums (stored as SMALLINT)

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Raised when a stored discriminant does not match any known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value {value}")]
pub struct UnknownDiscriminant {
    pub kind: &'static str,
    pub value: i16,
}

// ---------------------------------------------------------------------------
// TerminalType
// ---------------------------------------------------------------------------

/// Kind of device a terminal is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum TerminalType {
    Register = 0,
    Till = 1,
    AdminWorkstation = 2,
    KitchenDisplay = 3,
    MobileTerminal = 4,
    SelfCheckout = 5,
}

impl TerminalType {
    pub const ALL: [TerminalType; 6] = [
        TerminalType::Register,
        TerminalType::Till,
        TerminalType::AdminWorkstation,
        TerminalType::KitchenDisplay,
        TerminalType::MobileTerminal,
        TerminalType::SelfCheckout,
    ];

    /// Prefix used for generated terminal codes
    pub fn code_prefix(self) -> &'static str {
        match self {
            TerminalType::Register => "REG",
            TerminalType::Till => "TILL",
            TerminalType::AdminWorkstation => "ADM",
            TerminalType::KitchenDisplay => "KDS",
            TerminalType::MobileTerminal => "MOB",
            TerminalType::SelfCheckout => "SCO",
        }
    }
}

impl TryFrom<i16> for TerminalType {
    type Error = UnknownDiscriminant;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(TerminalType::Register),
            1 => Ok(TerminalType::Till),
            2 => Ok(TerminalType::AdminWorkstation),
            3 => Ok(TerminalType::KitchenDisplay),
            4 => Ok(TerminalType::MobileTerminal),
            5 => Ok(TerminalType::SelfCheckout),
            value => Err(UnknownDiscriminant { kind: "terminal type", value }),
        }
    }
}

impl From<TerminalType> for i16 {
    fn from(t: TerminalType) -> Self {
        t as i16
    }
}

impl std::fmt::Display for TerminalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TerminalType::Register => "Register",
            TerminalType::Till => "Till",
            TerminalType::AdminWorkstation => "Admin workstation",
            TerminalType::KitchenDisplay => "Kitchen display",
            TerminalType::MobileTerminal => "Mobile terminal",
            TerminalType::SelfCheckout => "Self checkout",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// BusinessMode
// ---------------------------------------------------------------------------

/// Which front-end flavour the terminal runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum BusinessMode {
    Supermarket = 0,
    Restaurant = 1,
    Admin = 2,
}

impl TryFrom<i16> for BusinessMode {
    type Error = UnknownDiscriminant;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(BusinessMode::Supermarket),
            1 => Ok(BusinessMode::Restaurant),
            2 => Ok(BusinessMode::Admin),
            value => Err(UnknownDiscriminant { kind: "business mode", value }),
        }
    }
}

impl From<BusinessMode> for i16 {
    fn from(m: BusinessMode) -> Self {
        m as i16
    }
}

// ---------------------------------------------------------------------------
// MachineIdentifierType
// ---------------------------------------------------------------------------

/// Source of a terminal's machine binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum MachineIdentifierType {
    MacAddress = 0,
    MachineGuid = 1,
    Generated = 2,
}

impl TryFrom<i16> for MachineIdentifierType {
    type Error = UnknownDiscriminant;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(MachineIdentifierType::MacAddress),
            1 => Ok(MachineIdentifierType::MachineGuid),
            2 => Ok(MachineIdentifierType::Generated),
            value => Err(UnknownDiscriminant { kind: "machine identifier type", value }),
        }
    }
}

impl From<MachineIdentifierType> for i16 {
    fn from(t: MachineIdentifierType) -> Self {
        t as i16
    }
}

// ---------------------------------------------------------------------------
// TerminalLifecycle
// ---------------------------------------------------------------------------

/// Soft-delete tag. `Inactive` is the end of a terminal's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TerminalLifecycle {
    Active,
    Inactive,
}

impl TerminalLifecycle {
    pub fn is_active(self) -> bool {
        matches!(self, TerminalLifecycle::Active)
    }
}

impl From<bool> for TerminalLifecycle {
    fn from(is_active: bool) -> Self {
        if is_active {
            TerminalLifecycle::Active
        } else {
            TerminalLifecycle::Inactive
        }
    }
}

// ---------------------------------------------------------------------------
// TerminalStatus
// ---------------------------------------------------------------------------

/// Displayed status derived from lifecycle and heartbeat freshness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Online,
    Offline,
    Inactive,
    /// The stored record could not be evaluated
    Unknown,
}

impl TerminalStatus {
    pub fn classify(lifecycle: TerminalLifecycle, heartbeat_fresh: bool) -> Self {
        match (lifecycle, heartbeat_fresh) {
            (TerminalLifecycle::Inactive, _) => TerminalStatus::Inactive,
            (TerminalLifecycle::Active, false) => TerminalStatus::Offline,
            (TerminalLifecycle::Active, true) => TerminalStatus::Online,
        }
    }
}

impl std::fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TerminalStatus::Online => "Online",
            TerminalStatus::Offline => "Offline",
            TerminalStatus::Inactive => "Inactive",
            TerminalStatus::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}
