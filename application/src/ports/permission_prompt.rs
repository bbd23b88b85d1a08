//! Permission prompt port
//!
//! Resolves requests the policy could not decide on its own (`Ask`).
//! Interactive front-ends implement this; the two automatic variants cover
//! unattended runs.

use async_trait::async_trait;
use conductor_domain::PermissionRequest;

#[async_trait]
pub trait PermissionPrompt: Send + Sync {
    /// `true` to allow the request.
    async fn ask(&self, request: &PermissionRequest) -> bool;

    /// Short name for logs and the audit trail.
    fn name(&self) -> &str {
        "prompt"
    }
}

/// Allows every request that reaches the prompt.
pub struct AutoApprovePrompt;

#[async_trait]
impl PermissionPrompt for AutoApprovePrompt {
    async fn ask(&self, _request: &PermissionRequest) -> bool {
        true
    }

    fn name(&self) -> &str {
        "auto_approve"
    }
}

/// Denies every request that reaches the prompt.
pub struct AutoDenyPrompt;

#[async_trait]
impl PermissionPrompt for AutoDenyPrompt {
    async fn ask(&self, _request: &PermissionRequest) -> bool {
        false
    }

    fn name(&self) -> &str {
        "auto_deny"
    }
}
