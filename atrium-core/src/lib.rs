//! Atrium Core - Entity Types and Query Model
//!
//! Pure data structures plus the small pure evaluators (operator catalog,
//! permission tree). All other crates depend on this. No I/O lives here.

pub mod config;
pub mod context;
pub mod entities;
pub mod error;
pub mod filter;
pub mod identity;
pub mod permission;
pub mod query;
pub mod schema;

pub use config::EngineConfig;
pub use context::RequestContext;
pub use entities::{
    Asset, AssetCreate, AssetUpdate, Developer, DeveloperUpdate, LogRecord, Project,
    ProjectUpdate, Role, RoleType, RoleUpdate, Staff, StaffCreate, StaffStatus, StaffUpdate,
    User, UserUpdate,
};
pub use error::{
    AccessError, AtriumError, AtriumResult, QueryError, SchemaError, StorageError,
};
pub use filter::{FilterOperator, VALID_OPERATORS};
pub use identity::{Doer, DoerType};
pub use permission::{tree_grants, PermissionTree};
pub use query::{
    ColumnRef, Condition, DeleteMode, Join, Predicate, Qualifier, SelectQuery, SortDirection,
    SortKey,
};
pub use schema::{
    Entity, EntityDescriptor, FieldDescriptor, FieldFilter, FieldKind, HasId, Record,
    RelationDescriptor,
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Current UTC timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}
