//! Database metrics collection.

use metrics::histogram;
use std::time::Instant;

/// Times a repository call and records it under
/// `database_query_duration_seconds{query, outcome}`.
///
/// ```ignore
/// let timer = QueryTimer::new("find_user_by_id");
/// let result = sqlx::query_as::<_, UserEntity>(...).fetch_optional(conn).await;
/// timer.record(&result);
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    /// Records the elapsed time, labelled with whether the query succeeded.
    pub fn record<T, E>(self, result: &Result<T, E>) {
        let outcome = if result.is_ok() { "ok" } else { "error" };
        histogram!(
            "database_query_duration_seconds",
            "query" => self.query_name,
            "outcome" => outcome
        )
        .record(self.start.elapsed().as_secs_f64());
    }
}
