//! Configuration repository.

use sqlx::PgConnection;

use crate::entities::ConfigurationItemEntity;
use crate::metrics::QueryTimer;

pub struct ConfigurationRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> ConfigurationRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// All configuration rows, ordered by key.
    pub async fn list_items(&mut self) -> Result<Vec<ConfigurationItemEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_configuration_items");
        let result = sqlx::query_as::<_, ConfigurationItemEntity>(
            r#"
            SELECT key, value, description
            FROM configuration_items
            ORDER BY key
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await;
        timer.record(&result);
        result
    }
}
