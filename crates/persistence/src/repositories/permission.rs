//! Permission repository.

use sqlx::PgConnection;

use crate::entities::{PermissionEntity, RolePermissionEntity};
use crate::metrics::QueryTimer;

/// Repository for permissions and their grants to roles.
pub struct PermissionRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PermissionRepository<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    pub async fn list_permissions(&mut self) -> Result<Vec<PermissionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_permissions");
        let result = sqlx::query_as::<_, PermissionEntity>(
            r#"
            SELECT id, key, description, group_name
            FROM permissions
            ORDER BY group_name, key
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await;
        timer.record(&result);
        result
    }

    pub async fn list_role_permissions(
        &mut self,
    ) -> Result<Vec<RolePermissionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_role_permissions");
        let result = sqlx::query_as::<_, RolePermissionEntity>(
            r#"
            SELECT role_id, permission_id
            FROM role_permissions
            ORDER BY role_id, permission_id
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await;
        timer.record(&result);
        result
    }
}
