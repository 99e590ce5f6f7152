//! Store model (owned by the back office, read-only here)

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Store {
    pub id: i32,
    pub name: String,
    pub is_active: bool,
}
