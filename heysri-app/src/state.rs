//! Console application state.
//!
//! `AppState` owns the running assistant together with the handles the
//! console drives it through: the scripted recogniser that stands in for a
//! microphone and the simulated device policy that stands in for the OS.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use heysri_core::{
    capability::DevicePolicy, CapabilityProvider, DeviceAdminCapability, RecognitionEngine,
    ScriptedEngine, ScriptedEngineHandle, VoiceAssistant, WebCapability,
};
use parking_lot::Mutex;
use tracing::info;

use crate::settings::AppSettings;

/// Device policy that records lock requests instead of locking anything.
#[derive(Debug, Default)]
pub struct SimulatedDevicePolicy {
    admin: AtomicBool,
    locks: AtomicUsize,
}

impl SimulatedDevicePolicy {
    pub fn new(admin_enabled: bool) -> Self {
        Self {
            admin: AtomicBool::new(admin_enabled),
            locks: AtomicUsize::new(0),
        }
    }

    pub fn set_admin(&self, enabled: bool) {
        self.admin.store(enabled, Ordering::SeqCst);
    }

    pub fn locks(&self) -> usize {
        self.locks.load(Ordering::SeqCst)
    }
}

impl DevicePolicy for SimulatedDevicePolicy {
    fn is_admin_active(&self) -> bool {
        self.admin.load(Ordering::SeqCst)
    }

    fn lock_now(&self) -> heysri_core::Result<()> {
        let count = self.locks.fetch_add(1, Ordering::SeqCst) + 1;
        info!(count, "screen locked (simulated)");
        Ok(())
    }
}

pub struct AppState {
    pub assistant: VoiceAssistant,
    /// Feeds speech into the assistant.
    pub engine: ScriptedEngineHandle,
    pub policy: Arc<SimulatedDevicePolicy>,
    /// Persisted app settings cache.
    pub settings: Mutex<AppSettings>,
    /// Absolute path to `settings.json`.
    pub settings_path: PathBuf,
}

impl AppState {
    /// Build the capability and recogniser described by `settings` and
    /// start the assistant. Must run inside the Tokio runtime.
    pub fn start(settings: AppSettings, settings_path: PathBuf) -> Self {
        let policy = Arc::new(SimulatedDevicePolicy::new(settings.device_admin_enabled));
        let capability: Arc<dyn CapabilityProvider> = if settings.native_capability {
            Arc::new(DeviceAdminCapability::from_shared(Arc::clone(&policy)))
        } else {
            Arc::new(WebCapability)
        };

        let (engine, handle) = ScriptedEngine::new();
        let engine: Box<dyn RecognitionEngine> = Box::new(engine);
        let assistant =
            VoiceAssistant::spawn(settings.to_assistant_config(), Some(engine), capability);

        Self {
            assistant,
            engine: handle,
            policy,
            settings: Mutex::new(settings),
            settings_path,
        }
    }

    pub async fn shutdown(self) {
        self.assistant.shutdown().await;
    }
}
