//! Permission gate seam.
//!
//! The workflow engine asks the gate once per step, before the first attempt.
//! A refusal becomes a terminal `PermissionDenied` failure for that step and
//! is never retried.

use crate::action::ActionRequest;

/// Approves or denies a step before it runs.
pub trait PermissionGate: Send + Sync {
    /// Return `true` if the request may proceed.
    fn check(&self, request: &ActionRequest) -> bool;

    /// Explain why `request` was refused.  Only consulted after `check`
    /// returned `false`.
    fn denial_reason(&self, request: &ActionRequest) -> String {
        format!("{}:{} is not permitted", request.category, request.action)
    }
}

/// A gate that approves everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn check(&self, _request: &ActionRequest) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DenyDeletes;

    impl PermissionGate for DenyDeletes {
        fn check(&self, request: &ActionRequest) -> bool {
            request.action != "delete"
        }
    }

    #[test]
    fn allow_all_allows() {
        assert!(AllowAll.check(&ActionRequest::new("delete", "filesystem")));
    }

    #[test]
    fn default_denial_reason_names_the_operation() {
        let request = ActionRequest::new("delete", "filesystem");
        assert!(!DenyDeletes.check(&request));
        assert_eq!(
            DenyDeletes.denial_reason(&request),
            "filesystem:delete is not permitted"
        );
    }
}
