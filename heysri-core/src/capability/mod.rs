//! Device capability abstraction.
//!
//! The `CapabilityProvider` trait is the boundary to whatever actually
//! performs device actions: a native bridge on the phone
//! ([`device::DeviceAdminCapability`]) or the stub used when running
//! outside a native shell ([`stub::WebCapability`]). The dispatcher holds
//! one behind an `Arc<dyn CapabilityProvider>`.
//!
//! Both calls are fallible and asynchronous. The dispatcher converts every
//! failure into an [`ActionResult`]; nothing here may panic across the
//! boundary.

pub mod device;
pub mod stub;

pub use device::{DeviceAdminCapability, DevicePolicy};
pub use stub::WebCapability;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Outcome of a device action, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

impl ActionResult {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Whether the OS privilege needed to lock the device ("device admin") is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionStatus {
    pub enabled: bool,
}

/// Contract for device-action backends.
#[async_trait]
pub trait CapabilityProvider: Send + Sync + 'static {
    /// `false` when running outside the native shell, where no device
    /// action can work.
    fn is_native(&self) -> bool {
        true
    }

    /// Lock the screen now.
    async fn lock_device(&self) -> Result<ActionResult>;

    async fn is_elevated_permission_enabled(&self) -> Result<PermissionStatus>;
}
