//! Entity stores over a pluggable backend.
//!
//! [`store::EntityStore`] is the CRUD surface every entity shares, with
//! soft deletes, owner scoping, and paginated listings. Mutations fan out
//! to per-entity changelog tables through [`audit::AuditEngine`], and
//! [`role::PermissionService`] answers permission checks from role trees.

pub mod audit;
pub mod registry;
pub mod role;
pub mod store;

pub use audit::{AuditEngine, AuditHandle, LogEvent};
pub use registry::{
    AssetStore, DeveloperStore, ProjectStore, RoleStore, StaffStore, Stores, UserStore,
};
pub use role::PermissionService;
pub use store::{EntityStore, StoreConfig, CREATE_LOG, DELETE_LOG, UPDATE_LOG};
