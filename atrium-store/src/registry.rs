//! Concrete store aliases and the bundle every handler layer receives.

use crate::audit::{AuditEngine, AuditHandle};
use crate::role::PermissionService;
use crate::store::{EntityStore, StoreConfig};
use atrium_core::entities::{
    Asset, AssetCreate, AssetUpdate, Developer, DeveloperUpdate, Project, ProjectUpdate, Role,
    RoleUpdate, Staff, StaffCreate, StaffUpdate, User, UserUpdate,
};
use atrium_core::error::AtriumResult;
use atrium_core::EngineConfig;
use atrium_storage::{SharedBackend, SharedCache};
use tokio::task::JoinHandle;

pub type StaffStore = EntityStore<Staff, StaffUpdate, StaffCreate>;
pub type UserStore = EntityStore<User, UserUpdate, User>;
pub type RoleStore = EntityStore<Role, RoleUpdate, Role>;
pub type AssetStore = EntityStore<Asset, AssetUpdate, AssetCreate>;
pub type ProjectStore = EntityStore<Project, ProjectUpdate, Project>;
pub type DeveloperStore = EntityStore<Developer, DeveloperUpdate, Developer>;

/// Every store over one backend, sharing one changelog writer.
#[derive(Clone)]
pub struct Stores {
    pub staff: StaffStore,
    pub users: UserStore,
    pub roles: RoleStore,
    pub assets: AssetStore,
    pub projects: ProjectStore,
    pub developers: DeveloperStore,
    pub permissions: PermissionService,
    pub audit: AuditHandle,
}

impl Stores {
    /// Open every store, spawning the changelog worker. The returned task
    /// handle finishes once all stores are dropped and the queue drains.
    pub async fn open(
        backend: SharedBackend,
        cache: SharedCache,
        engine: EngineConfig,
        config: StoreConfig,
    ) -> AtriumResult<(Self, JoinHandle<()>)> {
        let (audit, worker) = AuditEngine::spawn(backend.clone(), engine.audit_queue_capacity);
        let stores = Self {
            staff: EntityStore::new(
                backend.clone(),
                cache.clone(),
                Some(audit.clone()),
                engine.clone(),
                config.clone(),
            )
            .await?,
            users: EntityStore::new(
                backend.clone(),
                cache.clone(),
                Some(audit.clone()),
                engine.clone(),
                config.clone(),
            )
            .await?,
            roles: EntityStore::new(
                backend.clone(),
                cache.clone(),
                Some(audit.clone()),
                engine.clone(),
                config.clone(),
            )
            .await?,
            assets: EntityStore::new(
                backend.clone(),
                cache.clone(),
                Some(audit.clone()),
                engine.clone(),
                config.clone(),
            )
            .await?,
            projects: EntityStore::new(
                backend.clone(),
                cache.clone(),
                Some(audit.clone()),
                engine.clone(),
                config.clone(),
            )
            .await?,
            developers: EntityStore::new(
                backend.clone(),
                cache.clone(),
                Some(audit.clone()),
                engine.clone(),
                config,
            )
            .await?,
            permissions: PermissionService::new(backend),
            audit,
        };
        Ok((stores, worker))
    }
}
