//! Persistent application settings (JSON file in app data directory).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use heysri_core::{AssistantConfig, RecognizerConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
    pub restart_delay_ms: u64,
    pub status_reset_delay_ms: u64,
    /// `0` keeps a heard wake word armed until the next reset.
    pub wake_window_ms: u64,
    pub max_failed_restarts: u32,
    pub resume_after_command: bool,
    /// Drive the device-admin provider. `false` uses the web stub.
    pub native_capability: bool,
    /// Initial state of the simulated device-admin grant.
    pub device_admin_enabled: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            language: "en-IN".into(),
            continuous: true,
            interim_results: true,
            restart_delay_ms: 300,
            status_reset_delay_ms: 3_000,
            wake_window_ms: 6_000,
            max_failed_restarts: 25,
            resume_after_command: true,
            native_capability: true,
            device_admin_enabled: false,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.language = normalize_language_tag(&self.language);
        self.restart_delay_ms = self.restart_delay_ms.clamp(50, 5_000);
        self.status_reset_delay_ms = self.status_reset_delay_ms.clamp(500, 30_000);
        if self.wake_window_ms != 0 {
            self.wake_window_ms = self.wake_window_ms.clamp(1_000, 60_000);
        }
        self.max_failed_restarts = self.max_failed_restarts.clamp(1, 1_000);
    }

    pub fn to_assistant_config(&self) -> AssistantConfig {
        AssistantConfig {
            recognizer: RecognizerConfig {
                continuous: self.continuous,
                interim_results: self.interim_results,
                lang: self.language.clone(),
            },
            restart_delay: Duration::from_millis(self.restart_delay_ms),
            status_reset_delay: Duration::from_millis(self.status_reset_delay_ms),
            wake_window: (self.wake_window_ms > 0)
                .then(|| Duration::from_millis(self.wake_window_ms)),
            max_failed_restarts: self.max_failed_restarts,
            resume_after_command: self.resume_after_command,
        }
    }
}

/// Canonical BCP-47 casing (`en-in` → `en-IN`). Bare or empty English
/// falls back to Indian English.
pub fn normalize_language_tag(raw: &str) -> String {
    let tag = raw.trim().replace('_', "-");
    match tag.to_ascii_lowercase().as_str() {
        "" | "en" | "eng" | "english" => return "en-IN".into(),
        "hi" | "hindi" => return "hi-IN".into(),
        _ => {}
    }

    let mut parts = tag.split('-').filter(|p| !p.is_empty());
    let Some(language) = parts.next() else {
        return "en-IN".into();
    };
    let mut out = language.to_ascii_lowercase();
    for part in parts {
        out.push('-');
        if part.len() == 2 {
            out.push_str(&part.to_ascii_uppercase());
        } else {
            out.push_str(&part.to_ascii_lowercase());
        }
    }
    out
}

pub fn default_settings_path() -> PathBuf {
    if let Some(path) = std::env::var_os("HEYSRI_SETTINGS").filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("HeySri")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("heysri")
            .join("settings.json")
    }
}

/// Missing or malformed files fall back to defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("heysri-settings-{}-{name}", std::process::id()))
            .join("settings.json")
    }

    #[test]
    fn defaults_match_assistant_defaults() {
        let config = AppSettings::default().to_assistant_config();
        let expected = AssistantConfig::default();
        assert_eq!(config.recognizer, expected.recognizer);
        assert_eq!(config.restart_delay, expected.restart_delay);
        assert_eq!(config.status_reset_delay, expected.status_reset_delay);
        assert_eq!(config.wake_window, expected.wake_window);
        assert_eq!(config.max_failed_restarts, expected.max_failed_restarts);
        assert_eq!(config.resume_after_command, expected.resume_after_command);
    }

    #[test]
    fn language_tags_are_normalised() {
        assert_eq!(normalize_language_tag(""), "en-IN");
        assert_eq!(normalize_language_tag("English"), "en-IN");
        assert_eq!(normalize_language_tag("en_in"), "en-IN");
        assert_eq!(normalize_language_tag("hi"), "hi-IN");
        assert_eq!(normalize_language_tag(" en-us "), "en-US");
        assert_eq!(normalize_language_tag("zh-hant-tw"), "zh-hant-TW");
    }

    #[test]
    fn normalize_clamps_delays() {
        let mut settings = AppSettings {
            restart_delay_ms: 0,
            status_reset_delay_ms: 1_000_000,
            wake_window_ms: 10,
            max_failed_restarts: 0,
            ..AppSettings::default()
        };
        settings.normalize();
        assert_eq!(settings.restart_delay_ms, 50);
        assert_eq!(settings.status_reset_delay_ms, 30_000);
        assert_eq!(settings.wake_window_ms, 1_000);
        assert_eq!(settings.max_failed_restarts, 1);
    }

    #[test]
    fn zero_wake_window_disables_expiry() {
        let mut settings = AppSettings {
            wake_window_ms: 0,
            ..AppSettings::default()
        };
        settings.normalize();
        assert_eq!(settings.to_assistant_config().wake_window, None);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{ "language": "en-GB", "resumeAfterCommand": false }"#)
                .expect("parse");
        assert_eq!(settings.language, "en-GB");
        assert!(!settings.resume_after_command);
        assert_eq!(settings.restart_delay_ms, 300);
    }

    #[test]
    fn missing_or_broken_file_loads_defaults() {
        let path = scratch_path("broken");
        assert_eq!(load_settings(&path), AppSettings::default());

        save_settings(&path, &AppSettings::default()).expect("save");
        fs::write(&path, "{ not json").expect("corrupt");
        assert_eq!(load_settings(&path), AppSettings::default());
        let _ = fs::remove_dir_all(path.parent().expect("parent"));
    }

    #[test]
    fn saved_settings_load_back() {
        let path = scratch_path("saved");
        let settings = AppSettings {
            language: "hi-IN".into(),
            device_admin_enabled: true,
            ..AppSettings::default()
        };
        save_settings(&path, &settings).expect("save");
        assert_eq!(load_settings(&path), settings);
        let _ = fs::remove_dir_all(path.parent().expect("parent"));
    }
}
