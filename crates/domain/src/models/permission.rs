//! Permission and role-permission models.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A named capability that can be granted to roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i32,
    /// Identifier used in code, e.g. `users:manage`.
    pub key: String,
    pub description: String,
    pub group_name: String,
}

/// Grant of a permission to a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RolePermission {
    pub role_id: i32,
    pub permission_id: i32,
}

/// Resolves the permissions granted to `role_id`, in permission order.
pub fn permissions_for_role<'a>(
    role_id: i32,
    role_permissions: &[RolePermission],
    permissions: &'a [Permission],
) -> Vec<&'a Permission> {
    let granted: HashSet<i32> = role_permissions
        .iter()
        .filter(|rp| rp.role_id == role_id)
        .map(|rp| rp.permission_id)
        .collect();

    permissions
        .iter()
        .filter(|p| granted.contains(&p.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(id: i32, key: &str) -> Permission {
        Permission {
            id,
            key: key.to_string(),
            description: String::new(),
            group_name: "Users".to_string(),
        }
    }

    #[test]
    fn test_permissions_for_role() {
        let permissions = vec![
            permission(1, "users:read"),
            permission(2, "users:manage"),
            permission(3, "config:manage"),
        ];
        let grants = vec![
            RolePermission { role_id: 1, permission_id: 3 },
            RolePermission { role_id: 1, permission_id: 1 },
            RolePermission { role_id: 2, permission_id: 2 },
        ];

        let keys: Vec<_> = permissions_for_role(1, &grants, &permissions)
            .into_iter()
            .map(|p| p.key.as_str())
            .collect();
        assert_eq!(keys, vec!["users:read", "config:manage"]);
    }

    #[test]
    fn test_permissions_for_unknown_role() {
        let permissions = vec![permission(1, "users:read")];
        assert!(permissions_for_role(42, &[], &permissions).is_empty());
    }
}
