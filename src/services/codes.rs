//! Terminal code generation
//!
//! Codes look like `REG-001`: the terminal type prefix followed by a three
//! digit sequence, scoped to a store. Generation and the insert that uses the
//! code run under a per-(store, type) lock; across processes the
//! `(store_id, code)` unique constraint catches the remaining races.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::{AppError, AppResult},
    models::enums::TerminalType,
    repository::TerminalRepository,
};

static CODE_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]+(-[A-Z0-9]+)*$").unwrap());

#[derive(Clone)]
pub struct CodeGenerator {
    repository: Arc<dyn TerminalRepository>,
    locks: Arc<DashMap<(i32, TerminalType), Arc<Mutex<()>>>>,
}

impl CodeGenerator {
    pub fn new(repository: Arc<dyn TerminalRepository>) -> Self {
        Self {
            repository,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Next free code for `terminal_type` in the store.
    ///
    /// Does not reserve anything: callers that insert the code should hold
    /// [`CodeGenerator::lock`] until the insert completes.
    pub async fn generate_terminal_code(
        &self,
        store_id: i32,
        terminal_type: TerminalType,
    ) -> AppResult<String> {
        super::require_store(self.repository.as_ref(), store_id).await?;
        let prefix = terminal_type.code_prefix();
        let existing = self
            .repository
            .terminal_codes_with_prefix(store_id, prefix)
            .await?;
        let code = next_code(prefix, &existing)?;
        tracing::debug!("Generated terminal code {} for store {}", code, store_id);
        Ok(code)
    }

    /// Serialize code generation for one store and terminal type
    pub async fn lock(&self, store_id: i32, terminal_type: TerminalType) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry((store_id, terminal_type))
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}

/// Highest numeric suffix under `prefix` plus one, zero padded to three digits
pub fn next_code<I, S>(prefix: &str, existing: I) -> AppResult<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let highest = existing
        .into_iter()
        .filter_map(|code| sequence_of(prefix, code.as_ref()))
        .max()
        .unwrap_or(0);
    let next = highest.checked_add(1).ok_or_else(|| {
        AppError::Validation(format!("Code sequence for prefix {} is exhausted", prefix))
    })?;
    Ok(format!("{}-{:03}", prefix, next))
}

fn sequence_of(prefix: &str, code: &str) -> Option<u64> {
    let suffix = code.strip_prefix(prefix)?.strip_prefix('-')?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Canonical form of a caller supplied code (trimmed, upper case)
pub fn normalize_code(code: &str) -> AppResult<String> {
    let code = code.trim().to_uppercase();
    if !CODE_FORMAT.is_match(&code) {
        return Err(AppError::Validation(format!(
            "Invalid terminal code '{}': use letters, digits and single dashes",
            code
        )));
    }
    Ok(code)
}
