//! Permission tree evaluation.
//!
//! Grants are stored per role as a nested map keyed system, then resource,
//! then action, with the scope as the leaf string:
//!
//! ```json
//! {"admin": {"asset": {"view": "true", "create": "true"}}}
//! ```
//!
//! A required permission is a dotted `system.resource.action.scope` string,
//! e.g. `admin.asset.view.true`. Evaluation is fail-closed: anything
//! missing or malformed denies.

use std::collections::BTreeMap;

/// system -> resource -> action -> scope.
pub type PermissionTree = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

fn leaf<'a>(tree: &'a PermissionTree, system: &str, resource: &str, action: &str) -> Option<&'a str> {
    tree.get(system)?
        .get(resource)?
        .get(action)
        .map(String::as_str)
}

/// Evaluate one required permission against a grant tree.
///
/// The wildcard tree `{"*": {"*": {"*": "*"}}}` grants everything. A
/// resource whose `view` action is `"false"` denies every action on that
/// resource, including non-view ones. Otherwise the stored scope must
/// equal the required scope exactly.
pub fn tree_grants(tree: &PermissionTree, required: &str) -> bool {
    let parts: Vec<&str> = required.split('.').collect();
    if parts.len() < 4 {
        tracing::warn!(permission = required, "malformed permission, denying");
        return false;
    }
    let (system, resource, action, scope) = (parts[0], parts[1], parts[2], parts[3]);

    if leaf(tree, "*", "*", "*") == Some("*") {
        return true;
    }
    if leaf(tree, system, resource, "view") == Some("false") {
        return false;
    }
    leaf(tree, system, resource, action) == Some(scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(raw: serde_json::Value) -> PermissionTree {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_exact_scope_match() {
        let tree = tree(serde_json::json!({
            "admin": {"asset": {"view": "true", "create": "true"}}
        }));
        assert!(tree_grants(&tree, "admin.asset.view.true"));
        assert!(tree_grants(&tree, "admin.asset.create.true"));
        assert!(!tree_grants(&tree, "admin.asset.delete.true"));
        assert!(!tree_grants(&tree, "admin.asset.create.all"));
    }

    #[test]
    fn test_wildcard_grants_everything() {
        let tree = tree(serde_json::json!({"*": {"*": {"*": "*"}}}));
        assert!(tree_grants(&tree, "admin.asset.view.true"));
        assert!(tree_grants(&tree, "other.thing.delete.all"));
    }

    #[test]
    fn test_view_false_blocks_resource() {
        let tree = tree(serde_json::json!({
            "admin": {"asset": {"view": "false", "update": "true"}}
        }));
        assert!(!tree_grants(&tree, "admin.asset.update.true"));
        assert!(!tree_grants(&tree, "admin.asset.view.true"));
    }

    #[test]
    fn test_malformed_required_denies() {
        let tree = tree(serde_json::json!({"*": {"*": {"*": "*"}}}));
        assert!(!tree_grants(&tree, "admin.asset.view"));
        assert!(!tree_grants(&tree, ""));
    }

    #[test]
    fn test_empty_tree_denies() {
        assert!(!tree_grants(&PermissionTree::new(), "admin.asset.view.true"));
    }
}
