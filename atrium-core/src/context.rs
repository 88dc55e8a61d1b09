//! Per-request actor context.
//!
//! Carries the authenticated principal(s) and the action tag that labels
//! changelog rows. A staff member can act on a user's behalf, in which case
//! both principals are present and the user owns the rows being touched
//! while the staff member is the doer.

use crate::entities::{Staff, User};
use crate::identity::Doer;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub staff: Option<Staff>,
    pub user: Option<User>,
    /// Route-derived action label, e.g. `POST|assets`.
    pub action: Option<String>,
}

impl RequestContext {
    pub fn as_staff(staff: Staff) -> Self {
        Self {
            staff: Some(staff),
            user: None,
            action: None,
        }
    }

    pub fn as_user(user: User) -> Self {
        Self {
            staff: None,
            user: Some(user),
            action: None,
        }
    }

    /// No authenticated principal; the doer resolves to system.
    pub fn system() -> Self {
        Self::default()
    }

    /// Staff acting on a user account.
    pub fn staff_for_user(staff: Staff, user: User) -> Self {
        Self {
            staff: Some(staff),
            user: Some(user),
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Action label for changelog rows; falls back to the given default
    /// when no route tag was set.
    pub fn action_tag(&self, default: &str) -> String {
        match &self.action {
            Some(action) if !action.is_empty() => action.clone(),
            _ => default.to_string(),
        }
    }

    /// Resolve the acting principal. Staff wins over user when both are
    /// present since the staff member is the one performing the action.
    pub fn doer(&self) -> Doer {
        if let Some(staff) = &self.staff {
            return Doer::from_staff(staff);
        }
        if let Some(user) = &self.user {
            return Doer::from_user(user);
        }
        Doer::system()
    }
}
