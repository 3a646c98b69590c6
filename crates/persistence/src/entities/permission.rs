//! Permission entities.

use domain::models::{Permission, RolePermission};
use sqlx::FromRow;

/// Database row mapping for the permissions table.
#[derive(Debug, Clone, FromRow)]
pub struct PermissionEntity {
    pub id: i32,
    pub key: String,
    pub description: String,
    pub group_name: String,
}

impl From<PermissionEntity> for Permission {
    fn from(entity: PermissionEntity) -> Self {
        Self {
            id: entity.id,
            key: entity.key,
            description: entity.description,
            group_name: entity.group_name,
        }
    }
}

/// Database row mapping for the role_permissions table.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct RolePermissionEntity {
    pub role_id: i32,
    pub permission_id: i32,
}

impl From<RolePermissionEntity> for RolePermission {
    fn from(entity: RolePermissionEntity) -> Self {
        Self {
            role_id: entity.role_id,
            permission_id: entity.permission_id,
        }
    }
}
