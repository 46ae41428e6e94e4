//! Connection configuration and persisted settings
//!
//! The live [`ConnectionConfig`] carries the session password; the
//! serializable [`PersistedSettings`] projection structurally cannot —
//! it has no password field, so the "password is never persisted"
//! invariant is enforced by the type system rather than by UI discipline.

use crate::constants::{
    APP_DIR_NAME, DEFAULT_LDAPS_PORT, DEFAULT_LDAP_PORT, SETTINGS_FILE_NAME,
};
use crate::models::{SecureString, Username};
use crate::utils::AdError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// In-memory connection configuration for a directory session
///
/// Created from the settings UI, held in process memory for the session
/// lifetime, and read (never mutated) by every operation.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Domain controller hostname or FQDN
    pub server: String,
    /// LDAP/LDAPS port; 0 selects the protocol default
    pub port: u16,
    /// Account used for explicit-credential binds
    pub username: String,
    /// Session-scoped secret; never serialized
    pub password: SecureString,
    /// Default parent OU (distinguished name) for newly created objects
    pub parent_ou: Option<String>,
    /// Authenticate with the logged-on user's Kerberos context instead of
    /// explicit credentials
    pub use_kerberos: bool,
    /// Refuse to run any privileged operation without a verified TGT
    pub kerberos_only: bool,
    /// Connect over LDAPS
    pub use_ssl: bool,
}

impl ConnectionConfig {
    /// Effective port: the configured value, or the protocol default.
    pub fn effective_port(&self) -> u16 {
        if self.port != 0 {
            self.port
        } else if self.use_ssl {
            DEFAULT_LDAPS_PORT
        } else {
            DEFAULT_LDAP_PORT
        }
    }

    /// Caller-side validation, run before any script is built or any
    /// process spawned.
    pub fn validate(&self) -> Result<(), AdError> {
        if self.server.trim().is_empty() {
            return Err(AdError::Validation(
                "Server is required".to_string(),
            ));
        }
        if !self.use_kerberos {
            if self.username.trim().is_empty() {
                return Err(AdError::Validation(
                    "Username is required when not using Kerberos".to_string(),
                ));
            }
            Username::new(self.username.as_str())
                .map_err(|e| AdError::Validation(e.to_string()))?;
            if self.password.is_empty() {
                return Err(AdError::Validation(
                    "Password is required when not using Kerberos".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Non-secret projection for persistence.
    pub fn to_persisted(&self) -> PersistedSettings {
        PersistedSettings {
            server: self.server.clone(),
            port: self.port,
            username: self.username.clone(),
            parent_ou: self.parent_ou.clone(),
            use_kerberos: self.use_kerberos,
            kerberos_only: self.kerberos_only,
            use_ssl: self.use_ssl,
        }
    }
}

/// Non-secret connection settings persisted between sessions
///
/// Deliberately has no password field. Restoring a session requires the
/// user to re-enter the password (or run in Kerberos mode).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSettings {
    pub server: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub parent_ou: Option<String>,
    #[serde(default)]
    pub use_kerberos: bool,
    #[serde(default)]
    pub kerberos_only: bool,
    #[serde(default)]
    pub use_ssl: bool,
}

impl PersistedSettings {
    /// Rehydrate a live config by attaching the session password.
    pub fn into_config(self, password: SecureString) -> ConnectionConfig {
        ConnectionConfig {
            server: self.server,
            port: self.port,
            username: self.username,
            password,
            parent_ou: self.parent_ou,
            use_kerberos: self.use_kerberos,
            kerberos_only: self.kerberos_only,
            use_ssl: self.use_ssl,
        }
    }

    /// Default on-disk location under the platform local data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join(SETTINGS_FILE_NAME)
    }

    /// Load settings from `path`, returning defaults when the file does
    /// not exist yet.
    pub fn load_from(path: &std::path::Path) -> Result<Self, AdError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| AdError::Parse(format!("Settings file corrupt: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(AdError::Validation(format!(
                "Failed to read settings: {}",
                e
            ))),
        }
    }

    /// Save settings to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), AdError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AdError::Validation(format!("Failed to create settings dir: {}", e)))?;
        }
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| AdError::Parse(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(path, raw)
            .map_err(|e| AdError::Validation(format!("Failed to write settings: {}", e)))
    }
}
