//! Credential persistence.
//!
//! Session credentials are an opaque blob owned by the transport. This
//! module only stores and restores the latest snapshot.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SessionCredentials`] | Opaque credential blob |
//! | [`CredentialStore`] | Load/save capability |
//! | [`FileCredentialStore`] | Versioned JSON file inside the session directory |
//!
//! A missing or unreadable file never aborts the process: the session
//! manager treats both as "pairing required".

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// File name of the credential snapshot inside the session directory.
pub const CREDENTIALS_FILE: &str = "creds.json";

/// Current on-disk format version.
const FORMAT_VERSION: u32 = 1;

// ============================================================================
// SessionCredentials
// ============================================================================

/// Opaque session credentials.
///
/// Contents are never inspected; `Debug` output is redacted.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCredentials(Value);

impl SessionCredentials {
    /// Wraps a credential blob.
    #[inline]
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Returns the credential blob.
    #[inline]
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the credentials, returning the blob.
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCredentials(<redacted>)")
    }
}

// ============================================================================
// CredentialStore
// ============================================================================

/// Durable load/save capability for session credentials.
///
/// `save` overwrites the previous snapshot; there is no merge.
pub trait CredentialStore: Send + Sync {
    /// Loads the stored credentials.
    ///
    /// Returns `Ok(None)` if nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialStore`] if the snapshot exists but is unusable.
    fn load(&self) -> Result<Option<SessionCredentials>>;

    /// Durably stores a credential snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot could not be written.
    fn save(&self, credentials: &SessionCredentials) -> Result<()>;
}

// ============================================================================
// FileCredentialStore
// ============================================================================

/// On-disk envelope around the credential blob.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCredentials {
    format_version: u32,
    credentials: SessionCredentials,
}

/// Stores credentials as a versioned JSON file in a session directory.
///
/// Writes go to a temporary file in the same directory which is synced
/// and renamed over the previous snapshot.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    /// Session directory.
    dir: PathBuf,
}

impl FileCredentialStore {
    /// Opens the store, creating the session directory if missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        debug!(dir = %dir.display(), "Credential store opened");

        Ok(Self { dir })
    }

    /// Returns the path of the credential snapshot.
    #[inline]
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<SessionCredentials>> {
        let path = self.path();

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredCredentials = serde_json::from_slice(&bytes).map_err(|e| {
            Error::credential_store(format!("Corrupt snapshot {}: {e}", path.display()))
        })?;

        if stored.format_version != FORMAT_VERSION {
            return Err(Error::credential_store(format!(
                "Unsupported format version {} in {}",
                stored.format_version,
                path.display()
            )));
        }

        debug!(path = %path.display(), "Credentials loaded");

        Ok(Some(stored.credentials))
    }

    fn save(&self, credentials: &SessionCredentials) -> Result<()> {
        let stored = StoredCredentials {
            format_version: FORMAT_VERSION,
            credentials: credentials.clone(),
        };

        let mut file = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &stored)?;
            writer.flush()?;
        }
        file.as_file().sync_all()?;

        let path = self.path();
        file.persist(&path).map_err(|e| Error::Io(e.error))?;

        debug!(path = %path.display(), "Credentials saved");

        Ok(())
    }
}

// ============================================================================
// MemoryCredentialStore
// ============================================================================

#[cfg(test)]
pub(crate) use memory::MemoryCredentialStore;


// ============================================================================
// Tests
// ============================================================================
