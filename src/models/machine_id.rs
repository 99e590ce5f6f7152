//! Machine identifier validation and normalisation

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use super::enums::MachineIdentifierType;
use crate::error::{AppError, AppResult};

static MAC_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]{2}([:-][0-9A-Fa-f]{2}){5}$").unwrap());

static GENERATED_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{8,128}$").unwrap());

/// Check `value` against the format of `kind` and return its canonical form.
///
/// MAC addresses become upper-case and colon separated, GUIDs lower-case
/// hyphenated, generated identifiers are kept as-is.
pub fn normalize(value: &str, kind: MachineIdentifierType) -> AppResult<String> {
    let value = value.trim();
    match kind {
        MachineIdentifierType::MacAddress => {
            if !MAC_ADDRESS.is_match(value) {
                return Err(AppError::Validation(format!(
                    "Invalid MAC address: {}",
                    value
                )));
            }
            Ok(value.replace('-', ":").to_uppercase())
        }
        MachineIdentifierType::MachineGuid => uuid::Uuid::parse_str(value)
            .map(|guid| guid.hyphenated().to_string())
            .map_err(|_| AppError::Validation(format!("Invalid machine GUID: {}", value))),
        MachineIdentifierType::Generated => {
            if !GENERATED_ID.is_match(value) {
                return Err(AppError::Validation(format!(
                    "Invalid generated machine identifier: {}",
                    value
                )));
            }
            Ok(value.to_string())
        }
    }
}

/// Derive a stable fallback identifier for machines exposing neither a MAC
/// address nor an OS machine GUID.
pub fn generate_fallback(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    format!("GEN-{}", &hex::encode(digest)[..24].to_uppercase())
}
