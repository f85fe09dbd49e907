//! `DeviceAdminCapability` — native-backed provider over an OS device policy.
//!
//! [`DevicePolicy`] is the thin synchronous surface of the platform's
//! device-policy service (on Android, `DevicePolicyManager` for this app's
//! admin component). Policy calls may block on IPC with the OS, so they run
//! on Tokio's blocking pool rather than on the assistant's event loop.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{ActionResult, CapabilityProvider, PermissionStatus};
use crate::error::{AssistantError, Result};

pub const ADMIN_NOT_ENABLED_MESSAGE: &str = "Device admin not enabled. Please enable it first.";
pub const LOCKED_MESSAGE: &str = "Phone locked successfully";

/// Synchronous OS device-policy surface.
pub trait DevicePolicy: Send + Sync + 'static {
    /// Whether this app's device-admin component is active.
    fn is_admin_active(&self) -> bool;

    /// Lock the screen immediately.
    ///
    /// # Errors
    /// Returns an error if the OS refuses the request.
    fn lock_now(&self) -> Result<()>;
}

pub struct DeviceAdminCapability<P: DevicePolicy> {
    policy: Arc<P>,
}

impl<P: DevicePolicy> DeviceAdminCapability<P> {
    pub fn new(policy: P) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    pub fn from_shared(policy: Arc<P>) -> Self {
        Self { policy }
    }

    async fn on_policy<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&P) -> Result<T> + Send + 'static,
    {
        let policy = Arc::clone(&self.policy);
        tokio::task::spawn_blocking(move || f(policy.as_ref()))
            .await
            .map_err(|e| AssistantError::Capability(format!("device policy call failed: {e}")))?
    }
}

#[async_trait]
impl<P: DevicePolicy> CapabilityProvider for DeviceAdminCapability<P> {
    async fn lock_device(&self) -> Result<ActionResult> {
        self.on_policy(|policy| {
            // Re-checked here: the permission can be revoked at any time.
            if !policy.is_admin_active() {
                warn!("lock refused: device admin not active");
                return Err(AssistantError::Capability(ADMIN_NOT_ENABLED_MESSAGE.into()));
            }
            policy.lock_now()?;
            info!("device locked");
            Ok(ActionResult::succeeded(LOCKED_MESSAGE))
        })
        .await
    }

    async fn is_elevated_permission_enabled(&self) -> Result<PermissionStatus> {
        self.on_policy(|policy| {
            Ok(PermissionStatus {
                enabled: policy.is_admin_active(),
            })
        })
        .await
    }
}
