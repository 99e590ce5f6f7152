//! Terminal domain methods on the Postgres repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Repository, TerminalRepository};
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::MachineIdentifierType,
        store::Store,
        terminal::{NewTerminal, Terminal, TerminalEntry, TerminalRow},
    },
};

fn decode(row: TerminalRow) -> AppResult<Terminal> {
    let id = row.id;
    Terminal::try_from(row)
        .map_err(|e| AppError::Internal(format!("Terminal {} has an invalid record: {}", id, e)))
}

#[async_trait]
impl TerminalRepository for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn store_get_by_id(&self, store_id: i32) -> AppResult<Option<Store>> {
        let store = sqlx::query_as::<_, Store>("SELECT id, name, is_active FROM stores WHERE id = $1")
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(store)
    }

    async fn store_ids_with_terminals(&self) -> AppResult<Vec<i32>> {
        let ids: Vec<i32> =
            sqlx::query_scalar("SELECT DISTINCT store_id FROM terminals ORDER BY store_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    async fn terminal_get_by_id(&self, id: i32) -> AppResult<Option<Terminal>> {
        sqlx::query_as::<_, TerminalRow>("SELECT * FROM terminals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(decode)
            .transpose()
    }

    async fn terminal_entry_by_id(&self, id: i32) -> AppResult<Option<TerminalEntry>> {
        let row = sqlx::query_as::<_, TerminalRow>("SELECT * FROM terminals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(TerminalRow::into_entry))
    }

    async fn terminal_list_by_store(&self, store_id: i32) -> AppResult<Vec<TerminalEntry>> {
        let rows = sqlx::query_as::<_, TerminalRow>(
            "SELECT * FROM terminals WHERE store_id = $1 ORDER BY code",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TerminalRow::into_entry).collect())
    }

    async fn terminal_code_exists(&self, store_id: i32, code: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM terminals WHERE store_id = $1 AND code = $2)",
        )
        .bind(store_id)
        .bind(code)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn terminal_codes_with_prefix(&self, store_id: i32, prefix: &str) -> AppResult<Vec<String>> {
        let codes: Vec<String> = sqlx::query_scalar(
            "SELECT code FROM terminals WHERE store_id = $1 AND code LIKE $2",
        )
        .bind(store_id)
        .bind(format!("{}-%", prefix))
        .fetch_all(&self.pool)
        .await?;
        Ok(codes)
    }

    async fn terminal_create(&self, data: &NewTerminal) -> AppResult<Terminal> {
        // A unique violation on (store_id, code) surfaces as AppError::Concurrency
        let row = sqlx::query_as::<_, TerminalRow>(
            r#"
            INSERT INTO terminals (
                store_id, code, name, terminal_type, business_mode,
                machine_identifier, machine_identifier_type, ip_address, last_heartbeat,
                is_active, printer_configuration, hardware_configuration,
                created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(data.store_id)
        .bind(&data.code)
        .bind(&data.name)
        .bind(i16::from(data.terminal_type))
        .bind(i16::from(data.business_mode))
        .bind(&data.machine_identifier)
        .bind(data.machine_identifier_type.map(i16::from))
        .bind(&data.ip_address)
        .bind(data.last_heartbeat)
        .bind(&data.printer_configuration)
        .bind(&data.hardware_configuration)
        .bind(data.created_by)
        .bind(data.created_at)
        .fetch_one(&self.pool)
        .await?;
        decode(row)
    }

    async fn terminal_record_heartbeat(
        &self,
        id: i32,
        ip_address: &str,
        current_user_id: Option<i32>,
        at: DateTime<Utc>,
    ) -> AppResult<Terminal> {
        let row = sqlx::query_as::<_, TerminalRow>(
            r#"
            UPDATE terminals
            SET last_heartbeat = $2, ip_address = $3, current_user_id = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .bind(ip_address)
        .bind(current_user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::terminal_not_found(id))?;
        decode(row)
    }

    async fn terminal_update_configuration(
        &self,
        id: i32,
        printer_configuration: Option<String>,
        hardware_configuration: Option<String>,
        user_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Terminal> {
        let row = sqlx::query_as::<_, TerminalRow>(
            r#"
            UPDATE terminals
            SET printer_configuration = $2, hardware_configuration = $3,
                updated_by = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(printer_configuration)
        .bind(hardware_configuration)
        .bind(user_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::terminal_not_found(id))?;
        decode(row)
    }

    async fn terminal_set_machine(
        &self,
        id: i32,
        machine: Option<(String, MachineIdentifierType)>,
        user_id: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Terminal> {
        let (identifier, kind) = match machine {
            Some((identifier, kind)) => (Some(identifier), Some(i16::from(kind))),
            None => (None, None),
        };
        let row = sqlx::query_as::<_, TerminalRow>(
            r#"
            UPDATE terminals
            SET machine_identifier = $2, machine_identifier_type = $3,
                updated_by = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(identifier)
        .bind(kind)
        .bind(user_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::terminal_not_found(id))?;
        decode(row)
    }

    async fn terminal_deactivate(&self, id: i32, user_id: i32, at: DateTime<Utc>) -> AppResult<Terminal> {
        let row = sqlx::query_as::<_, TerminalRow>(
            r#"
            UPDATE terminals
            SET is_active = FALSE, updated_by = $2, updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::terminal_not_found(id))?;
        decode(row)
    }
}
