//! Permission lookups served from the application cache.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use domain::models::{permissions_for_role, Permission};

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    pub id: i32,
    pub key: String,
    pub description: String,
    pub group_name: String,
}

impl From<&Permission> for PermissionResponse {
    fn from(permission: &Permission) -> Self {
        Self {
            id: permission.id,
            key: permission.key.clone(),
            description: permission.description.clone(),
            group_name: permission.group_name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionListResponse {
    pub data: Vec<PermissionResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissionsResponse {
    pub role_id: i32,
    pub data: Vec<PermissionResponse>,
}

/// GET /api/v1/permissions
pub async fn list_permissions(
    State(state): State<AppState>,
) -> Result<Json<PermissionListResponse>, ApiError> {
    let permissions = state.cache.permissions().await?;

    Ok(Json(PermissionListResponse {
        data: permissions.iter().map(PermissionResponse::from).collect(),
    }))
}

/// GET /api/v1/roles/:role_id/permissions
///
/// A role without grants yields an empty list.
pub async fn list_role_permissions(
    State(state): State<AppState>,
    Path(role_id): Path<i32>,
) -> Result<Json<RolePermissionsResponse>, ApiError> {
    let permissions = state.cache.permissions().await?;
    let role_permissions = state.cache.role_permissions().await?;

    let data = permissions_for_role(role_id, &role_permissions, &permissions)
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(RolePermissionsResponse { role_id, data }))
}
