//! Test fixtures for the atrium workspace.
//!
//! Builders for every entity, permission trees in both granted and denied
//! shapes, and a seeded in-memory backend the integration suites share.

pub use atrium_storage::{Backend, MemoryBackend, MemoryCache, SharedBackend, SharedCache};

use atrium_core::entities::{
    Asset, Developer, Project, Role, RoleType, Staff, StaffStatus, User,
};
use atrium_core::{new_entity_id, now, EntityId, RequestContext};
use serde_json::{json, Value};

// ============================================================================
// PERMISSION TREES
// ============================================================================

/// `*.*.*` grants everything.
pub fn wildcard_permissions() -> Value {
    json!({ "*": { "*": { "*": "*" } } })
}

/// Asset read/write, staff view switched off.
pub fn agent_permissions() -> Value {
    json!({
        "admin": {
            "asset": {
                "view": "true",
                "create": "true",
                "update": "true",
                "delete": "true",
            },
            "project": { "view": "true" },
            "staff": { "view": "false", "update": "true" },
        }
    })
}

// ============================================================================
// ENTITY BUILDERS
// ============================================================================

pub fn role_fixture(name: &str, permissions: Value) -> Role {
    Role {
        id: new_entity_id(),
        created_at: now(),
        updated_at: now(),
        deleted_at: None,
        role_type: RoleType::Admin,
        name: name.to_string(),
        description: String::new(),
        permissions,
        count_staff: None,
    }
}

pub fn staff_fixture(email: &str, role_id: Option<EntityId>) -> Staff {
    Staff {
        id: new_entity_id(),
        created_at: now(),
        updated_at: now(),
        deleted_at: None,
        email: email.to_string(),
        first_name: "Anan".to_string(),
        last_name: "Srisuk".to_string(),
        last_login: None,
        status: StaffStatus::Active,
        phone: Some("+66810000000".to_string()),
        role_id,
        role: None,
    }
}

pub fn user_fixture(email: &str) -> User {
    User {
        id: new_entity_id(),
        email: email.to_string(),
        first_name: "Mali".to_string(),
        last_name: "Chai".to_string(),
        phone: Some("+66820000000".to_string()),
        status: Some("active".to_string()),
        ..User::default()
    }
}

pub fn developer_fixture(name: &str) -> Developer {
    Developer {
        id: new_entity_id(),
        name: name.to_string(),
        ..Developer::default()
    }
}

pub fn project_fixture(name: &str, developer_id: Option<EntityId>) -> Project {
    Project {
        id: new_entity_id(),
        name: name.to_string(),
        developer_id,
        ..Project::default()
    }
}

pub fn asset_fixture(no: &str, zone: &str) -> Asset {
    Asset {
        id: new_entity_id(),
        no: Some(no.to_string()),
        zone: Some(zone.to_string()),
        kind: Some("condo".to_string()),
        price: Some(4_500_000.0),
        ..Asset::default()
    }
}

// ============================================================================
// CONTEXTS
// ============================================================================

pub fn staff_ctx(staff: &Staff) -> RequestContext {
    RequestContext::as_staff(staff.clone())
}

pub fn user_ctx(user: &User) -> RequestContext {
    RequestContext::as_user(user.clone())
}

// ============================================================================
// SEEDED BACKEND
// ============================================================================

/// Ids of the rows [`seeded_backend`] writes.
pub struct Seed {
    pub admin_role: Role,
    pub agent_role: Role,
    pub admin: Staff,
    pub agent: Staff,
    pub buyer: User,
    pub developer: Developer,
    pub project: Project,
    pub assets: Vec<Asset>,
}

/// Backend with the same unique indexes the real schema carries.
pub fn empty_backend() -> MemoryBackend {
    MemoryBackend::new()
        .with_unique("staffs", "email")
        .with_unique("users", "email")
        .with_unique("projects", "name")
        .with_unique("developers", "name")
}

/// A small but complete dataset: two roles, two staff, one user, one
/// developer with one project, and `asset_count` assets alternating
/// between two zones. Odd-numbered assets belong to the buyer.
pub async fn seeded_backend(asset_count: usize) -> (SharedBackend, Seed) {
    let backend = empty_backend().into_shared();

    let admin_role = role_fixture("superadmin", wildcard_permissions());
    let agent_role = role_fixture("agent", agent_permissions());
    let admin = staff_fixture("admin@atrium.test", Some(admin_role.id));
    let agent = staff_fixture("agent@atrium.test", Some(agent_role.id));
    let buyer = user_fixture("buyer@atrium.test");
    let developer = developer_fixture("Sansiri");
    let project = project_fixture("The Line Asoke", Some(developer.id));

    insert(&backend, "roles", &admin_role).await;
    insert(&backend, "roles", &agent_role).await;
    insert(&backend, "staffs", &admin).await;
    insert(&backend, "staffs", &agent).await;
    insert(&backend, "users", &buyer).await;
    insert(&backend, "developers", &developer).await;
    insert(&backend, "projects", &project).await;

    let mut assets = Vec::with_capacity(asset_count);
    for i in 0..asset_count {
        let zone = if i % 2 == 0 { "Sukhumvit" } else { "Sathorn" };
        let mut asset = asset_fixture(&format!("A-{i:03}"), zone);
        asset.project_id = project.id;
        if i % 2 == 1 {
            asset.user_id = Some(buyer.id);
        }
        insert(&backend, "assets", &asset).await;
        assets.push(asset);
    }

    (
        backend,
        Seed {
            admin_role,
            agent_role,
            admin,
            agent,
            buyer,
            developer,
            project,
            assets,
        },
    )
}

async fn insert<M: serde::Serialize>(backend: &SharedBackend, table: &str, row: &M) {
    let value = serde_json::to_value(row).unwrap();
    backend.insert(table, value).await.unwrap();
}
