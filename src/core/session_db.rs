//! Durable, at-rest-encrypted store for authenticated broker sessions.
//! Records are keyed by `<platform>:<account>`; neither the key nor the value
//! is readable from the on-disk file.
use std::path::Path;
use std::sync::Mutex;

use log::*;

use crate::core::common::POISONED_MUTEX;
use crate::core::crypto::{
    decrypt, derive_iv, encrypt, encrypt_with_iv, AesMode, SecureKey,
};
use crate::core::errors::OptionBridgeError;

const SESSIONS_TREE: &str = "sessions";

/// Key the store opens with so it is usable before `set_key`.  Callers are
/// expected to install a real key right after opening.
const DEFAULT_KEY: [u8; 32] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
    0x0F, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D,
    0x1E, 0x1F,
];

//==================================================================================================
/// Encrypted session store backed by a sled tree named "sessions".
///
/// The stored lookup key is the AES ciphertext of the logical key
/// `<platform>:<account>`, computed with an IV derived from the logical key
/// itself so lookups are repeatable.  Values are encrypted with a fresh
/// random IV on every write.
pub struct SessionDb {
    inner: Mutex<SessionDbInner>,
}

struct SessionDbInner {
    // kept alive for the tree; also the flush handle
    db: sled::Db,
    tree: sled::Tree,
    aes_key: SecureKey,
    mode: AesMode,
}

impl SessionDb {
    /// Opens (or creates) the store at `path` with the given cipher mode.
    pub fn open<P: AsRef<Path>>(path: P, mode: AesMode) -> Result<Self, OptionBridgeError> {
        let db = sled::open(path)?;
        let tree = db.open_tree(SESSIONS_TREE)?;
        let mut aes_key = SecureKey::new()?;
        aes_key.set_key(&DEFAULT_KEY[..mode.key_len()]);
        debug!("session db opened, mode: {}", mode);
        Ok(SessionDb {
            inner: Mutex::new(SessionDbInner {
                db,
                tree,
                aes_key,
                mode,
            }),
        })
    }

    //----------------------------------------------------------------------------------------------
    /// Installs the symmetric key used for all subsequent encryption.
    /// Fails with `KeyLengthMismatch` unless the length matches the mode.
    pub fn set_key(&self, key: &[u8]) -> Result<(), OptionBridgeError> {
        let mut inner = self.inner.lock().expect(POISONED_MUTEX);
        if key.len() != inner.mode.key_len() {
            return Err(OptionBridgeError::KeyLengthMismatch {
                expected: inner.mode.key_len(),
                actual: key.len(),
            });
        }
        inner.aes_key.set_key(key);
        Ok(())
    }

    //----------------------------------------------------------------------------------------------
    /// Retrieves a session value.  `Ok(None)` when no record exists;
    /// `DecryptError` when the stored row is corrupted (other rows are
    /// unaffected).
    pub fn get(&self, platform: &str, account: &str) -> Result<Option<String>, OptionBridgeError> {
        let inner = self.inner.lock().expect(POISONED_MUTEX);
        let db_key = Self::lookup_key(&inner, platform, account)?;
        let stored = inner.tree.get(&db_key)?;
        let stored = match stored {
            Some(value) => value,
            None => return Ok(None),
        };
        let plain = inner
            .aes_key
            .with_key(|key| decrypt(&stored, key, inner.mode))?;
        let value = String::from_utf8(plain).map_err(|_| {
            OptionBridgeError::DecryptError("decrypted session value is not valid UTF-8".to_string())
        })?;
        Ok(Some(value))
    }

    //----------------------------------------------------------------------------------------------
    /// Stores a session value, overwriting any existing record.
    pub fn set(
        &self,
        platform: &str,
        account: &str,
        value: &str,
    ) -> Result<(), OptionBridgeError> {
        let inner = self.inner.lock().expect(POISONED_MUTEX);
        let db_key = Self::lookup_key(&inner, platform, account)?;
        let encrypted = inner
            .aes_key
            .with_key(|key| encrypt(value.as_bytes(), key, inner.mode))?;
        inner.tree.insert(db_key, encrypted)?;
        inner.db.flush()?;
        Ok(())
    }

    //----------------------------------------------------------------------------------------------
    /// Removes a session record.  Removing a missing record is not an error.
    pub fn remove(&self, platform: &str, account: &str) -> Result<(), OptionBridgeError> {
        let inner = self.inner.lock().expect(POISONED_MUTEX);
        let db_key = Self::lookup_key(&inner, platform, account)?;
        inner.tree.remove(db_key)?;
        inner.db.flush()?;
        Ok(())
    }

    //----------------------------------------------------------------------------------------------
    /// Wipes every session record.
    pub fn clear(&self) -> Result<(), OptionBridgeError> {
        let inner = self.inner.lock().expect(POISONED_MUTEX);
        inner.tree.clear()?;
        inner.db.flush()?;
        Ok(())
    }

    //----------------------------------------------------------------------------------------------
    /// Encrypts the logical key with a derived (stable) IV so the same
    /// platform/account pair always maps to the same stored key bytes.
    fn lookup_key(
        inner: &SessionDbInner,
        platform: &str,
        account: &str,
    ) -> Result<Vec<u8>, OptionBridgeError> {
        let logical = format!("{}:{}", platform, account);
        let iv = derive_iv(logical.as_bytes());
        inner
            .aes_key
            .with_key(|key| encrypt_with_iv(logical.as_bytes(), key, inner.mode, &iv))
    }
}
