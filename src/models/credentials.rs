//! Credential types for directory authentication
//!
//! SECURITY: Credential types implement Drop to clear sensitive data.

use crate::utils::CredentialError;
use std::fmt;

/// Windows username in various formats
///
/// Valid formats:
/// - `user` (implicit domain)
/// - `DOMAIN\\user` (down-level logon name)
/// - `user@domain.com` (UPN format)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    /// Create a new username after validation
    pub fn new(username: impl Into<String>) -> Result<Self, CredentialError> {
        let username = username.into();

        if username.is_empty() {
            return Err(CredentialError::InvalidUsername(
                "Username cannot be empty".to_string(),
            ));
        }

        if username.len() > 256 {
            return Err(CredentialError::InvalidUsername(
                "Username exceeds maximum length (256)".to_string(),
            ));
        }

        Ok(Username(username))
    }

    /// Get the username as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = CredentialError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Username::new(value)
    }
}

impl TryFrom<&str> for Username {
    type Error = CredentialError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Username::new(value)
    }
}

/// Password that zeros memory on drop
///
/// SECURITY: This type never implements Display or Debug in a way that
/// reveals the password, and it is deliberately absent from every
/// serializable settings type so it can never reach persisted storage.
pub struct SecureString(String);

impl Clone for SecureString {
    fn clone(&self) -> Self {
        SecureString(self.0.clone())
    }
}

impl SecureString {
    /// Create a new secure string
    pub fn new(password: impl Into<String>) -> Self {
        SecureString(password.into())
    }

    /// Get the password as a string slice
    ///
    /// Use this sparingly and only when building the stdin payload.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the length of the password
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the password is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for SecureString {
    fn drop(&mut self) {
        // Zero the memory
        // SAFETY: We own this String and are zeroing it before drop
        unsafe {
            let bytes = self.0.as_bytes_mut();
            for byte in bytes {
                std::ptr::write_volatile(byte, 0);
            }
        }
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // SECURITY: Never reveal the password content
        write!(f, "SecureString(*** {} bytes ***)", self.0.len())
    }
}
