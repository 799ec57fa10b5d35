//! Log of conversational AI calls.

use serde_json::Value;
use sqlx::PgPool;

use shoppy_core::UserId;

use super::RepositoryError;

/// One call to record.
#[derive(Debug, Clone)]
pub struct ApiUsageEntry<'a> {
    pub user_id: UserId,
    /// Logical operation, e.g. `chat` or `create_user`.
    pub endpoint: &'a str,
    pub request: Value,
    pub response: Option<Value>,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Repository for the `api_usage` table.
pub struct ApiUsageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ApiUsageRepository<'a> {
    /// Create a new usage repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert one usage row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(&self, entry: ApiUsageEntry<'_>) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO api_usage
                (user_id, endpoint, request_data, response_data, success, error_message)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(entry.user_id)
        .bind(entry.endpoint)
        .bind(entry.request)
        .bind(entry.response)
        .bind(entry.success)
        .bind(entry.error_message)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
