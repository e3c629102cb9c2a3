use crate::error::{errors, VaultResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.json";

/// Flat settings record persisted on disk.
///
/// Every field has a default so a hand-edited or partially written file
/// still loads. `access_token` and `refresh_token` are either both set
/// (authenticated) or both unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorization_code: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub folder_id: String,
    pub file_directory: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            authorization_code: String::new(),
            access_token: None,
            refresh_token: None,
            folder_id: String::new(),
            file_directory: String::new(),
        }
    }
}

impl Settings {
    /// True when a previous authorization left both tokens behind.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }

    /// Store a freshly issued token pair.
    pub fn set_tokens(&mut self, access_token: String, refresh_token: String) {
        self.access_token = Some(access_token);
        self.refresh_token = Some(refresh_token);
    }

    /// Drop both tokens, returning to the unauthenticated state.
    pub fn clear_tokens(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
    }

    /// The sync directory with `~/` expanded.
    pub fn resolved_file_directory(&self) -> VaultResult<String> {
        expand_path(&self.file_directory)
    }
}

/// Loads and saves [`Settings`] at a fixed path.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings_path: PathBuf,
}

impl SettingsStore {
    pub fn new() -> VaultResult<Self> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| errors::config_error("Could not find home directory"))?;

        let vaultdrive_dir = home_dir.join(".vaultdrive");

        fs::create_dir_all(&vaultdrive_dir).map_err(|e| {
            errors::config_error(format!("Failed to create settings directory: {}", e))
        })?;

        Ok(Self {
            settings_path: vaultdrive_dir.join(SETTINGS_FILE_NAME),
        })
    }

    /// Create a store backed by a custom path, used by tests to keep
    /// fixtures away from the real `~/.vaultdrive/settings.json`.
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            settings_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings, writing a default file first if none exists.
    pub fn load(&self) -> VaultResult<Settings> {
        if !self.settings_path.exists() {
            let defaults = Settings::default();
            self.save(&defaults)?;
            return Ok(defaults);
        }

        let content = fs::read_to_string(&self.settings_path)
            .map_err(|e| errors::config_error(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| errors::config_error(format!("Invalid settings file: {}", e)))
    }

    pub fn save(&self, settings: &Settings) -> VaultResult<()> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                errors::config_error(format!("Failed to create settings directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| errors::config_error(format!("Failed to serialize settings: {}", e)))?;

        fs::write(&self.settings_path, content)
            .map_err(|e| errors::config_error(format!("Failed to write settings file: {}", e)))
    }
}

/// Expand tilde based paths into absolute directories.
pub fn expand_path(path: &str) -> VaultResult<String> {
    if let Some(stripped) = path.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| errors::config_error("Could not find home directory"))?;
        Ok(home.join(stripped).to_string_lossy().into_owned())
    } else {
        Ok(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_created() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("settings.json");

        let store = SettingsStore::with_path(&file);
        let settings = store.load().unwrap();

        assert!(file.exists());
        assert!(settings.client_id.is_empty());
        assert_eq!(settings.redirect_uri, "urn:ietf:wg:oauth:2.0:oob");
        assert!(!settings.is_authenticated());
    }

    #[test]
    fn settings_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("settings.json");
        let store = SettingsStore::with_path(&file);

        let mut settings = Settings::default();
        settings.client_id = "client-123".to_string();
        settings.folder_id = "folder-abc".to_string();
        settings.set_tokens("access".to_string(), "refresh".to_string());
        store.save(&settings).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, settings);
        assert!(loaded.is_authenticated());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("settings.json");
        fs::write(&file, r#"{"client_id":"only-this"}"#).unwrap();

        let loaded = SettingsStore::with_path(&file).load().unwrap();
        assert_eq!(loaded.client_id, "only-this");
        assert_eq!(loaded.redirect_uri, "urn:ietf:wg:oauth:2.0:oob");
        assert!(loaded.access_token.is_none());
    }

    #[test]
    fn clear_tokens_restores_unauthenticated_state() {
        let mut settings = Settings::default();
        settings.set_tokens("a".to_string(), "r".to_string());
        assert!(settings.is_authenticated());

        settings.clear_tokens();
        assert!(!settings.is_authenticated());
        assert!(settings.access_token.is_none());
        assert!(settings.refresh_token.is_none());
    }

    #[test]
    fn expand_path_handles_tilde() {
        let expanded = expand_path("~/vault").unwrap();
        assert!(!expanded.starts_with("~/"));
        assert!(expanded.ends_with("vault"));

        let unchanged = expand_path("/absolute/path").unwrap();
        assert_eq!(unchanged, "/absolute/path");
    }
}
