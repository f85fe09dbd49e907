//! `WebCapability` — provider for non-native environments.
//!
//! Used when the assistant runs in a browser or a desktop shell. Nothing
//! can be locked there, so every action reports a descriptive failure.

use async_trait::async_trait;
use tracing::debug;

use super::{ActionResult, CapabilityProvider, PermissionStatus};
use crate::error::Result;

pub const NOT_NATIVE_MESSAGE: &str = "Lock command only works on Android";

#[derive(Debug, Clone, Copy, Default)]
pub struct WebCapability;

#[async_trait]
impl CapabilityProvider for WebCapability {
    fn is_native(&self) -> bool {
        false
    }

    async fn lock_device(&self) -> Result<ActionResult> {
        debug!("WebCapability::lock_device: not available outside the native shell");
        Ok(ActionResult::failed(NOT_NATIVE_MESSAGE))
    }

    async fn is_elevated_permission_enabled(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus { enabled: false })
    }
}
