//! Role assumption seam
//!
//! The toolkit does not speak the STS wire protocol itself. Hosts plug in a
//! [`RoleAssumer`] that exchanges source credentials for temporary ones.

use super::snapshot::CredentialSnapshot;
use crate::error::ToolkitResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Parameters for a single AssumeRole call
#[derive(Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    /// Profile that declared the role
    pub profile: String,
    pub role_arn: String,
    pub session_name: String,
    pub external_id: Option<String>,
    /// MFA device, present together with `token_code`
    pub serial_number: Option<String>,
    pub token_code: Option<String>,
    pub duration_seconds: Option<u32>,
    pub region: Option<String>,
    /// Credentials used to sign the call
    pub source_credentials: CredentialSnapshot,
}

impl fmt::Debug for AssumeRoleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumeRoleRequest")
            .field("profile", &self.profile)
            .field("role_arn", &self.role_arn)
            .field("session_name", &self.session_name)
            .field("serial_number", &self.serial_number)
            .field("token_code", &self.token_code.as_ref().map(|_| "[REDACTED]"))
            .field("duration_seconds", &self.duration_seconds)
            .field("region", &self.region)
            .field("source_credentials", &self.source_credentials)
            .finish()
    }
}

/// Client able to assume IAM roles
///
/// Implementations return temporary credentials with an expiry and report
/// network trouble as `TransientRemote`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleAssumer: Send + Sync {
    async fn assume_role(&self, request: AssumeRoleRequest) -> ToolkitResult<CredentialSnapshot>;
}

pub type SharedRoleAssumer = Arc<dyn RoleAssumer>;
