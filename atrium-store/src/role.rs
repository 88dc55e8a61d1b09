//! Role lookup and permission checks.
//!
//! Permission names follow `{system}.{resource}.{action}.{scope}`. A check
//! passes when the role's tree grants any of the required permissions;
//! every failure mode, including a missing role or malformed tree, denies.

use atrium_core::entities::Role;
use atrium_core::filter::FilterOperator;
use atrium_core::permission::tree_grants;
use atrium_core::query::{ColumnRef, Predicate, SelectQuery};
use atrium_core::EntityId;
use atrium_storage::SharedBackend;
use serde_json::Value;
use tracing::warn;

pub const SYSTEM_ADMIN: &str = "admin";

pub const ACTION_FIND: &str = "view";
pub const ACTION_CREATE: &str = "create";
pub const ACTION_UPDATE: &str = "update";
pub const ACTION_DELETE: &str = "delete";
pub const ACTION_UNLOCK: &str = "unlock";

pub const SCOPE_ALL: &str = "true";

pub const ROLE_VIEW_ALL: &str = "admin.role.view.true";
pub const ROLE_CREATE_ALL: &str = "admin.role.create.true";
pub const ROLE_UPDATE_ALL: &str = "admin.role.update.true";
pub const ROLE_EXPORT_ALL: &str = "admin.role.export.true";

pub const STAFF_VIEW_ALL: &str = "admin.staff.view.true";
pub const STAFF_CREATE_ALL: &str = "admin.staff.create.true";
pub const STAFF_UPDATE_ALL: &str = "admin.staff.update.true";
pub const STAFF_DELETE_ALL: &str = "admin.staff.delete.true";
pub const STAFF_UNLOCK_ALL: &str = "admin.staff.unlock.true";

pub const STAFF_ME_FIND_SELF: &str = "admin.staff_me.view.true";
pub const STAFF_ME_LOG_SELF: &str = "admin.staff_me.log.true";

pub const USER_VIEW_ALL: &str = "admin.user.view.true";
pub const USER_UPDATE_ALL: &str = "admin.user.update.true";
pub const USER_DELETE_ALL: &str = "admin.user.delete.true";
pub const USER_UNLOCK_ALL: &str = "admin.user.unlock.true";

pub const DEVELOPER_VIEW_ALL: &str = "admin.developer.view.true";
pub const DEVELOPER_CREATE_ALL: &str = "admin.developer.create.true";
pub const DEVELOPER_UPDATE_ALL: &str = "admin.developer.update.true";
pub const DEVELOPER_EXPORT_ALL: &str = "admin.developer.export.true";
pub const DEVELOPER_DELETE_ALL: &str = "admin.developer.delete.true";

pub const PROJECT_VIEW_ALL: &str = "admin.project.view.true";
pub const PROJECT_CREATE_ALL: &str = "admin.project.create.true";
pub const PROJECT_UPDATE_ALL: &str = "admin.project.update.true";
pub const PROJECT_EXPORT_ALL: &str = "admin.project.export.true";
pub const PROJECT_DELETE_ALL: &str = "admin.project.delete.true";

pub const ASSET_VIEW_ALL: &str = "admin.asset.view.true";
pub const ASSET_CREATE_ALL: &str = "admin.asset.create.true";
pub const ASSET_UPDATE_ALL: &str = "admin.asset.update.true";
pub const ASSET_EXPORT_ALL: &str = "admin.asset.export.true";
pub const ASSET_DELETE_ALL: &str = "admin.asset.delete.true";

#[derive(Clone)]
pub struct PermissionService {
    backend: SharedBackend,
}

impl PermissionService {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Load a role by id, live rows only.
    pub async fn role(&self, id: EntityId) -> Option<Role> {
        let mut query = SelectQuery::table("roles");
        query.and_where(Predicate::cond(
            ColumnRef::plain("id"),
            FilterOperator::Eq,
            Value::String(id.to_string()),
        ));
        query.limit = Some(1);
        let row = match self.backend.select(&query).await {
            Ok(rows) => rows.into_iter().next()?,
            Err(e) => {
                warn!(role_id = %id, error = %e, "role lookup failed");
                return None;
            }
        };
        match serde_json::from_value(row) {
            Ok(role) => Some(role),
            Err(e) => {
                warn!(role_id = %id, error = %e, "role row does not decode");
                None
            }
        }
    }

    /// Whether the role grants any of the required permissions. Denies on
    /// a missing role id, an unknown role, or an unreadable tree.
    pub async fn has_permission(
        &self,
        role_id: Option<EntityId>,
        required: &[&str],
    ) -> bool {
        let role_id = match role_id {
            Some(id) => id,
            None => return false,
        };
        let role = match self.role(role_id).await {
            Some(role) => role,
            None => return false,
        };
        let tree = match role.permission_tree() {
            Ok(tree) => tree,
            Err(e) => {
                warn!(role_id = %role_id, error = %e, "permission tree does not parse");
                return false;
            }
        };
        required.iter().any(|name| tree_grants(&tree, name))
    }
}
