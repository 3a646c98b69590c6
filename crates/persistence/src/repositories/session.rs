//! Session repository.

use chrono::{DateTime, Utc};
use domain::models::{NewSession, NewSessionLog};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::entities::{SessionEntity, SessionEventEntity};
use crate::metrics::QueryTimer;

/// Repository for login sessions, their logs and the event lookup table.
pub struct SessionRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> SessionRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    pub async fn list_events(&mut self) -> Result<Vec<SessionEventEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_session_events");
        let result = sqlx::query_as::<_, SessionEventEntity>(
            r#"
            SELECT id, key, description
            FROM session_events
            ORDER BY id
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await;
        timer.record(&result);
        result
    }

    pub async fn create(&mut self, session: &NewSession) -> Result<SessionEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_session");
        let result = sqlx::query_as::<_, SessionEntity>(
            r#"
            INSERT INTO sessions (id, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, created_at, expires_at, ended_at
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .fetch_one(&mut *self.conn)
        .await;
        timer.record(&result);
        result
    }

    pub async fn find_by_id(&mut self, id: Uuid) -> Result<Option<SessionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_session_by_id");
        let result = sqlx::query_as::<_, SessionEntity>(
            r#"
            SELECT id, user_id, created_at, expires_at, ended_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await;
        timer.record(&result);
        result
    }

    /// Ends an open session. Returns false if it was unknown or already ended.
    pub async fn end(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("end_session");
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET ended_at = $2
            WHERE id = $1 AND ended_at IS NULL
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&mut *self.conn)
        .await;
        timer.record(&result);
        Ok(result?.rows_affected() > 0)
    }

    pub async fn add_log(&mut self, entry: &NewSessionLog) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("add_session_log");
        let result = sqlx::query(
            r#"
            INSERT INTO session_logs (session_id, event_id, message)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(entry.session_id)
        .bind(entry.event_id)
        .bind(entry.message.as_deref())
        .execute(&mut *self.conn)
        .await;
        timer.record(&result);
        result.map(|_| ())
    }
}
