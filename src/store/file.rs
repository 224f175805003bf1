//! Token persistence using a local JSON file.

use std::ffi::OsString;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{CredentialRecord, TokenStore};
use crate::error::StoreError;

/// Stores the credential record in a single JSON file.
///
/// Writes go to a sibling temp file which is renamed over the target, so a
/// reader sees either the old record or the new one.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("token.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<CredentialRecord> {
        if !self.path.exists() {
            debug!("Token file {:?} does not exist", self.path);
            return None;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read token file {:?}: {}", self.path, e);
                return None;
            }
        };

        match serde_json::from_str::<CredentialRecord>(&content) {
            Ok(record) if record.access_token.is_empty() => {
                warn!("Token file {:?} has an empty access token, ignoring", self.path);
                None
            }
            Ok(record) => {
                debug!("Loaded token from {:?}", self.path);
                Some(record)
            }
            Err(e) => {
                warn!("Failed to parse token file {:?}: {}, ignoring", self.path, e);
                None
            }
        }
    }

    fn save(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(record)?;
        let temp_path = self.temp_path();

        // A temp file left by an interrupted save may carry other permissions
        match fs::remove_file(&temp_path) {
            Ok(()) => debug!("Removed stale temp file {:?}", temp_path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = write_private(&temp_path, content.as_bytes())
            .and_then(|_| fs::rename(&temp_path, &self.path))
        {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        debug!("Saved token to {:?}", self.path);
        Ok(())
    }
}

/// Write `contents` to `path`, readable and writable by the owner only.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
