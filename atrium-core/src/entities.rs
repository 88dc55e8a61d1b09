//! Entity model
//!
//! Each stored entity carries the common base columns (id, created_at,
//! updated_at, deleted_at) inline, a `Create` shape used when callers are
//! not allowed to set server-managed columns, and an `Update` shape whose
//! fields are all optional so absent values never overwrite stored ones.
//!
//! The `DESCRIPTOR` statics declare the queryable surface once per process.
//! Virtual fields such as `project_name` carry no column of their own; they
//! resolve through a joined relation.

use crate::error::SchemaError;
use crate::filter::FilterOperator;
use crate::permission::PermissionTree;
use crate::schema::{Entity, EntityDescriptor, FieldKind, HasId};
use crate::{EntityId, Timestamp};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// STAFF
// ============================================================================

/// Lifecycle state of a staff account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffStatus {
    Active,
    Inactive,
    Pending,
}

impl Default for StaffStatus {
    fn default() -> Self {
        StaffStatus::Pending
    }
}

/// Back-office operator account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub id: EntityId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,

    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<Timestamp>,
    #[serde(default)]
    pub status: StaffStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<EntityId>,
    /// Populated by relation loading, never stored on the staff row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl Staff {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffCreate {
    pub id: EntityId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaffUpdate {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StaffStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<EntityId>,
}

static STAFF_DESCRIPTOR: Lazy<EntityDescriptor> = Lazy::new(|| {
    EntityDescriptor::builder("staff", "staffs")
        .field("id", FieldKind::Uuid)
        .filtered("email", FieldKind::Text, FilterOperator::Like)
        .filtered("first_name", FieldKind::Text, FilterOperator::Eq)
        .filtered("last_name", FieldKind::Text, FilterOperator::Eq)
        .field("last_login", FieldKind::Timestamp)
        .filtered("status", FieldKind::Text, FilterOperator::Eq)
        .filtered("phone", FieldKind::Text, FilterOperator::Eq)
        .filtered("role_id", FieldKind::Uuid, FilterOperator::Eq)
        .relation("Role", "roles", "role_id")
        .build()
});

impl Entity for Staff {
    fn descriptor() -> &'static EntityDescriptor {
        &STAFF_DESCRIPTOR
    }
}

// ============================================================================
// USER
// ============================================================================

/// Customer account with CRM metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: EntityId,
    #[serde(default = "crate::now")]
    pub created_at: Timestamp,
    #[serde(default = "crate::now")]
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,

    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_buy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_sell: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_per_month: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Staff member responsible for this account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo_at: Option<Timestamp>,

    /// Buyer/seller tags, matched with jsonb containment.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: EntityId::default(),
            created_at: crate::now(),
            updated_at: crate::now(),
            deleted_at: None,
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            last_login: None,
            phone: None,
            budget_buy: None,
            budget_sell: None,
            budget_per_month: None,
            source: None,
            staff_id: None,
            todo: None,
            todo_at: None,
            kind: None,
            interest: None,
            tag: None,
            status: None,
            last_activity_at: None,
            last_activity: None,
            full_name: None,
            display_name: None,
            gender: None,
        }
    }
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_buy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_sell: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_per_month: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo_at: Option<Timestamp>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
}

static USER_DESCRIPTOR: Lazy<EntityDescriptor> = Lazy::new(|| {
    EntityDescriptor::builder("user", "users")
        .field("id", FieldKind::Uuid)
        .filtered("email", FieldKind::Text, FilterOperator::Like)
        .filtered("first_name", FieldKind::Text, FilterOperator::Eq)
        .filtered("last_name", FieldKind::Text, FilterOperator::Eq)
        .filtered("phone", FieldKind::Text, FilterOperator::Eq)
        .filtered("staff_id", FieldKind::Uuid, FilterOperator::Eq)
        .filtered("type", FieldKind::JsonCollection, FilterOperator::In)
        .filtered("interest", FieldKind::JsonCollection, FilterOperator::In)
        .filtered("tag", FieldKind::JsonCollection, FilterOperator::In)
        .filtered("status", FieldKind::Text, FilterOperator::Eq)
        .field("last_activity_at", FieldKind::Timestamp)
        .relation("Staff", "staffs", "staff_id")
        .build()
});

impl Entity for User {
    fn descriptor() -> &'static EntityDescriptor {
        &USER_DESCRIPTOR
    }
}

// ============================================================================
// ROLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleType {
    #[serde(rename = "SUPER_ADMIN")]
    SuperAdmin,
    #[serde(rename = "ADMIN")]
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: EntityId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,

    #[serde(rename = "type")]
    pub role_type: RoleType,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Nested system.resource.action grant map, stored as jsonb.
    pub permissions: Value,
    /// Derived at read time, never stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_staff: Option<i64>,
}

impl Role {
    /// Decode the stored grant map. A malformed tree denies everything, so
    /// surfacing the schema error here beats silently granting nothing.
    pub fn permission_tree(&self) -> Result<PermissionTree, SchemaError> {
        serde_json::from_value(self.permissions.clone()).map_err(|_| SchemaError::NullField {
            entity: "role",
            field: "permissions".to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleUpdate {
    pub id: EntityId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub role_type: Option<RoleType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Value>,
}

static ROLE_DESCRIPTOR: Lazy<EntityDescriptor> = Lazy::new(|| {
    EntityDescriptor::builder("role", "roles")
        .field("id", FieldKind::Uuid)
        .field("type", FieldKind::Text)
        .field("name", FieldKind::Text)
        .field("description", FieldKind::Text)
        .field("permissions", FieldKind::Json)
        .build()
});

impl Entity for Role {
    fn descriptor() -> &'static EntityDescriptor {
        &ROLE_DESCRIPTOR
    }
}

// ============================================================================
// ASSET
// ============================================================================

/// Property listing tied to a project and optionally a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub id: EntityId,
    #[serde(default = "crate::now")]
    pub created_at: Timestamp,
    #[serde(default = "crate::now")]
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,

    /// Listing reference number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no: Option<String>,
    pub project_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl Default for Asset {
    fn default() -> Self {
        Self {
            id: EntityId::default(),
            created_at: crate::now(),
            updated_at: crate::now(),
            deleted_at: None,
            no: None,
            project_id: EntityId::default(),
            user_id: None,
            description: None,
            map: None,
            size: None,
            zone: None,
            kind: None,
            price: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCreate {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no: Option<String>,
    pub project_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetUpdate {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

static ASSET_DESCRIPTOR: Lazy<EntityDescriptor> = Lazy::new(|| {
    EntityDescriptor::builder("asset", "assets")
        .field("id", FieldKind::Uuid)
        .filtered("no", FieldKind::Text, FilterOperator::Eq)
        .filtered("project_id", FieldKind::Uuid, FilterOperator::Eq)
        .filtered("user_id", FieldKind::Uuid, FilterOperator::Eq)
        .foreign_filtered(
            "project_name",
            FieldKind::Text,
            FilterOperator::Like,
            "Project",
            "name",
        )
        .foreign_filtered(
            "user_first_name",
            FieldKind::Text,
            FilterOperator::Like,
            "User",
            "first_name",
        )
        .foreign_filtered(
            "user_last_name",
            FieldKind::Text,
            FilterOperator::Like,
            "User",
            "last_name",
        )
        .filtered("description", FieldKind::Text, FilterOperator::Like)
        .field("map", FieldKind::Text)
        .field("size", FieldKind::Float)
        .filtered("zone", FieldKind::Text, FilterOperator::Eq)
        .filtered("type", FieldKind::Text, FilterOperator::Eq)
        .field("price", FieldKind::Float)
        .relation("Project", "projects", "project_id")
        .relation("User", "users", "user_id")
        .build()
});

impl Entity for Asset {
    fn descriptor() -> &'static EntityDescriptor {
        &ASSET_DESCRIPTOR
    }
}

// ============================================================================
// PROJECT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: EntityId,
    #[serde(default = "crate::now")]
    pub created_at: Timestamp,
    #[serde(default = "crate::now")]
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,

    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_id: Option<EntityId>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            id: EntityId::default(),
            created_at: crate::now(),
            updated_at: crate::now(),
            deleted_at: None,
            name: String::new(),
            developer_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_id: Option<EntityId>,
}

static PROJECT_DESCRIPTOR: Lazy<EntityDescriptor> = Lazy::new(|| {
    EntityDescriptor::builder("project", "projects")
        .field("id", FieldKind::Uuid)
        .filtered("name", FieldKind::Text, FilterOperator::Like)
        .filtered("developer_id", FieldKind::Uuid, FilterOperator::Eq)
        .relation("Developer", "developers", "developer_id")
        .build()
});

impl Entity for Project {
    fn descriptor() -> &'static EntityDescriptor {
        &PROJECT_DESCRIPTOR
    }
}

// ============================================================================
// DEVELOPER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Developer {
    #[serde(default)]
    pub id: EntityId,
    #[serde(default = "crate::now")]
    pub created_at: Timestamp,
    #[serde(default = "crate::now")]
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,

    pub name: String,
}

impl Default for Developer {
    fn default() -> Self {
        Self {
            id: EntityId::default(),
            created_at: crate::now(),
            updated_at: crate::now(),
            deleted_at: None,
            name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeveloperUpdate {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

static DEVELOPER_DESCRIPTOR: Lazy<EntityDescriptor> = Lazy::new(|| {
    EntityDescriptor::builder("developer", "developers")
        .field("id", FieldKind::Uuid)
        .filtered("name", FieldKind::Text, FilterOperator::Like)
        .build()
});

impl Entity for Developer {
    fn descriptor() -> &'static EntityDescriptor {
        &DEVELOPER_DESCRIPTOR
    }
}

// ============================================================================
// CHANGELOG
// ============================================================================

/// One changelog row. The same shape is written to every `<entity>_logs`
/// table; `from_table` is set only on cross-posted copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: EntityId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,

    /// Snapshot of the affected model at the time of the action.
    pub model: Value,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_table: Option<String>,
    /// Who performed the action, embedded as jsonb.
    pub doer: Value,
}

static LOG_DESCRIPTOR: Lazy<EntityDescriptor> = Lazy::new(|| {
    EntityDescriptor::builder("log", "logs")
        .field("id", FieldKind::Uuid)
        .filtered("model", FieldKind::Json, FilterOperator::In)
        .filtered("action", FieldKind::Text, FilterOperator::Eq)
        .field("from_table", FieldKind::Text)
        .field("doer", FieldKind::Json)
        .build()
});

impl Entity for LogRecord {
    fn descriptor() -> &'static EntityDescriptor {
        &LOG_DESCRIPTOR
    }
}

// ============================================================================
// ID ACCESS
// ============================================================================

macro_rules! impl_has_id {
    ($($ty:ty),+ $(,)?) => {
        $(impl HasId for $ty {
            fn id(&self) -> EntityId {
                self.id
            }
        })+
    };
}

impl_has_id!(
    Staff,
    StaffCreate,
    StaffUpdate,
    User,
    UserUpdate,
    Role,
    RoleUpdate,
    Asset,
    AssetCreate,
    AssetUpdate,
    Project,
    ProjectUpdate,
    Developer,
    DeveloperUpdate,
    LogRecord,
);

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_skips_absent_fields() {
        let update = AssetUpdate {
            id: crate::new_entity_id(),
            zone: Some("Sukhumvit".to_string()),
            ..Default::default()
        };
        let row = serde_json::to_value(&update).unwrap();
        let keys: Vec<&String> = row.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["id", "zone"]);
    }

    #[test]
    fn test_asset_virtual_fields_resolve_through_relations() {
        let descriptor = Asset::descriptor();
        let field = descriptor.field("project_name").unwrap();
        let filter = field.filter.as_ref().unwrap();
        assert_eq!(filter.relation, Some(("Project", "name")));
        assert_eq!(filter.operator, FilterOperator::Like);
        // the relation the virtual field points at must be declared
        assert!(descriptor.relation("Project").is_ok());
        assert!(descriptor.relation("User").is_ok());
    }

    #[test]
    fn test_descriptor_log_tables() {
        assert_eq!(Staff::descriptor().log_table(), "staff_logs");
        assert_eq!(Asset::descriptor().log_table(), "asset_logs");
    }

    #[test]
    fn test_role_permission_tree_decodes() {
        let role = Role {
            id: crate::new_entity_id(),
            created_at: crate::now(),
            updated_at: crate::now(),
            deleted_at: None,
            role_type: RoleType::Admin,
            name: "ops".to_string(),
            description: String::new(),
            permissions: json!({"admin": {"asset": {"view": "true", "create": "all"}}}),
            count_staff: None,
        };
        let tree = role.permission_tree().unwrap();
        assert_eq!(tree["admin"]["asset"]["create"], "all");
    }

    #[test]
    fn test_role_type_wire_names() {
        assert_eq!(
            serde_json::to_value(RoleType::SuperAdmin).unwrap(),
            json!("SUPER_ADMIN")
        );
        assert_eq!(serde_json::to_value(RoleType::Admin).unwrap(), json!("ADMIN"));
    }

    #[test]
    fn test_user_jsonb_field_wire_name() {
        let user = User {
            email: "a@b.c".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            kind: Some(json!(["buyer"])),
            ..Default::default()
        };
        let row = serde_json::to_value(&user).unwrap();
        assert_eq!(row["type"], json!(["buyer"]));
        assert!(row.get("kind").is_none());
    }
}
