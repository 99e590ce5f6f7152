//! Data models for Tillwatch

pub mod enums;
pub mod health;
pub mod machine_id;
pub mod store;
pub mod terminal;
pub mod user;

// Re-export commonly used types
pub use enums::{BusinessMode, MachineIdentifierType, TerminalLifecycle, TerminalStatus, TerminalType};
pub use health::{StoreHealthSummary, TerminalHealth};
pub use store::Store;
pub use terminal::{CreateTerminal, Heartbeat, NewTerminal, Terminal, TerminalEntry};
pub use user::UserClaims;
