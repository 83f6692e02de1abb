//! Identity persistence.
//!
//! The identity lives under a single storage key (`auth`). The file backend
//! writes `<dir>/auth.json`:
//!
//! ```jsonc
//! { "privateKey": "<hex>", "publicKey": "<hex>", "nickname": "WaryBaron635" }
//! ```
//!
//! Writes go to a temp file first and are renamed into place, so a failed
//! write leaves the previous record untouched. The key is stored in
//! plaintext, like the browser client keeps it in local storage; restrict
//! the directory if that matters.

use super::Identity;
use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Storage key of the identity record.
pub const STORAGE_KEY: &str = "auth";

/// Where an [`Identity`] is kept between sessions.
pub trait IdentityStorage: Send + Sync {
    /// Stored identity, `None` when nothing (or an empty record) is stored.
    fn load(&self) -> Result<Option<Identity>>;

    /// Replace the stored identity.
    fn save(&self, identity: &Identity) -> Result<()>;
}

/// JSON file under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (or create) storage at `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .map_err(|e| Error::Storage(format!("create storage dir: {e}")))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = fs::set_permissions(&dir, fs::Permissions::from_mode(0o700));
            }
        }
        Ok(Self { dir })
    }

    /// Path of the identity file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{STORAGE_KEY}.json"))
    }
}

impl IdentityStorage for FileStorage {
    fn load(&self) -> Result<Option<Identity>> {
        let path = self.path();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Storage(format!("read {}: {e}", path.display()))),
        };
        let identity: Identity = serde_json::from_slice(&data)?;
        Ok((!identity.is_empty()).then_some(identity))
    }

    fn save(&self, identity: &Identity) -> Result<()> {
        let json = serde_json::to_vec_pretty(identity)?;
        write_atomic(&self.path(), &json)
    }
}

/// Process-local storage, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<Identity>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Identity>> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slot.clone().filter(|id| !id.is_empty()))
    }

    fn save(&self, identity: &Identity) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(identity.clone());
        Ok(())
    }
}

/// Stored identity if there is one, otherwise a fresh one that has been
/// saved before it is returned.
///
/// A stored record whose keys and nickname disagree is reported as
/// `CorruptedIdentity` rather than silently replaced.
pub fn load_or_generate(storage: &dyn IdentityStorage) -> Result<Identity> {
    if let Some(identity) = storage.load()? {
        identity.check()?;
        tracing::debug!(nickname = %identity.nickname, "loaded identity");
        return Ok(identity);
    }
    let identity = Identity::generate();
    storage.save(&identity)?;
    Ok(identity)
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(data)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
