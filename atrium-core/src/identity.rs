//! Actor identity embedded in changelog rows.

use crate::entities::{Role, Staff, User};
use crate::EntityId;
use serde::{Deserialize, Serialize};

/// What kind of principal performed an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoerType {
    Staff,
    User,
    System,
}

/// The actor stamped onto every changelog row. Serialized into the row's
/// `doer` jsonb column, so the snapshot survives account deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doer {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub doer_type: DoerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl Doer {
    pub fn from_staff(staff: &Staff) -> Self {
        Self {
            id: staff.id,
            name: staff.full_name(),
            email: staff.email.clone(),
            doer_type: DoerType::Staff,
            role_id: staff.role_id,
            role: staff.role.clone(),
        }
    }

    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.full_name(),
            email: user.email.clone(),
            doer_type: DoerType::User,
            role_id: None,
            role: None,
        }
    }

    /// Actor for actions with no authenticated principal, such as
    /// migrations and scheduled jobs.
    pub fn system() -> Self {
        Self {
            id: EntityId::default(),
            name: "system".to_string(),
            email: String::new(),
            doer_type: DoerType::System,
            role_id: None,
            role: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_doer_type_wire_names() {
        assert_eq!(serde_json::to_value(DoerType::Staff).unwrap(), json!("staff"));
        assert_eq!(serde_json::to_value(DoerType::System).unwrap(), json!("system"));
    }

    #[test]
    fn test_doer_serializes_type_key() {
        let doer = Doer::system();
        let row = serde_json::to_value(&doer).unwrap();
        assert_eq!(row["type"], json!("system"));
        assert_eq!(row["name"], json!("system"));
        assert!(row.get("role_id").is_none());
    }
}
