//! AES helpers for the session store.  Ciphertexts carry their IV as the
//! first 16 bytes; CBC modes use PKCS#7 padding, CFB modes none.
use std::fmt;
use std::ptr;
use std::sync::atomic::{compiler_fence, Ordering};

use num_derive::FromPrimitive;
use openssl::rand::rand_bytes;
use openssl::sha::sha256;
use openssl::symm::{decrypt as openssl_decrypt, encrypt as openssl_encrypt, Cipher};
use serde::{Deserialize, Serialize};

use crate::core::errors::OptionBridgeError;

/// AES block size in bytes (128 bits)
pub const BLOCK_SIZE: usize = 16;

/// Largest supported key length (AES-256)
pub const MAX_KEY_LEN: usize = 32;

//==================================================================================================
/// Supported AES cipher modes
#[repr(i32)]
#[derive(Serialize, Deserialize, Clone, Copy, Debug, FromPrimitive, PartialEq, Eq)]
pub enum AesMode {
    Cbc128,
    Cbc192,
    Cbc256,
    Cfb128,
    Cfb192,
    Cfb256,
}

impl AesMode {
    /// Key length in bytes required by this mode
    pub fn key_len(self) -> usize {
        match self {
            AesMode::Cbc128 | AesMode::Cfb128 => 16,
            AesMode::Cbc192 | AesMode::Cfb192 => 24,
            AesMode::Cbc256 | AesMode::Cfb256 => 32,
        }
    }

    //----------------------------------------------------------------------------------------------
    pub(crate) fn cipher(self) -> Cipher {
        match self {
            AesMode::Cbc128 => Cipher::aes_128_cbc(),
            AesMode::Cbc192 => Cipher::aes_192_cbc(),
            AesMode::Cbc256 => Cipher::aes_256_cbc(),
            AesMode::Cfb128 => Cipher::aes_128_cfb128(),
            AesMode::Cfb192 => Cipher::aes_192_cfb128(),
            AesMode::Cfb256 => Cipher::aes_256_cfb128(),
        }
    }
}

impl fmt::Display for AesMode {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AesMode::Cbc128 => write!(fmt, "CBC_128"),
            AesMode::Cbc192 => write!(fmt, "CBC_192"),
            AesMode::Cbc256 => write!(fmt, "CBC_256"),
            AesMode::Cfb128 => write!(fmt, "CFB_128"),
            AesMode::Cfb192 => write!(fmt, "CFB_192"),
            AesMode::Cfb256 => write!(fmt, "CFB_256"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
/// Zeroes a buffer holding key material.  Volatile writes plus a compiler
/// fence so the wipe survives optimization.
pub fn secure_clear(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        unsafe {
            ptr::write_volatile(byte, 0);
        }
    }
    compiler_fence(Ordering::SeqCst);
}

//--------------------------------------------------------------------------------------------------
fn check_key_len(key: &[u8], mode: AesMode) -> Result<(), OptionBridgeError> {
    if key.len() != mode.key_len() {
        return Err(OptionBridgeError::KeyLengthMismatch {
            expected: mode.key_len(),
            actual: key.len(),
        });
    }
    Ok(())
}

//--------------------------------------------------------------------------------------------------
/// Generates a fresh random IV
pub fn generate_iv() -> Result<[u8; BLOCK_SIZE], OptionBridgeError> {
    let mut iv = [0u8; BLOCK_SIZE];
    rand_bytes(&mut iv)?;
    Ok(iv)
}

//--------------------------------------------------------------------------------------------------
/// Derives a stable IV from arbitrary input.  Used for the session store's
/// lookup keys, which must encrypt to the same ciphertext on every call.
pub fn derive_iv(input: &[u8]) -> [u8; BLOCK_SIZE] {
    let digest = sha256(input);
    let mut iv = [0u8; BLOCK_SIZE];
    iv.copy_from_slice(&digest[..BLOCK_SIZE]);
    iv
}

//--------------------------------------------------------------------------------------------------
/// Encrypts with a fresh random IV.  Output layout: `IV(16) || ciphertext`.
pub fn encrypt(plain: &[u8], key: &[u8], mode: AesMode) -> Result<Vec<u8>, OptionBridgeError> {
    let iv = generate_iv()?;
    encrypt_with_iv(plain, key, mode, &iv)
}

//--------------------------------------------------------------------------------------------------
/// Encrypts with a caller-supplied IV.  Output layout: `IV(16) || ciphertext`.
pub fn encrypt_with_iv(
    plain: &[u8],
    key: &[u8],
    mode: AesMode,
    iv: &[u8; BLOCK_SIZE],
) -> Result<Vec<u8>, OptionBridgeError> {
    check_key_len(key, mode)?;
    let ciphertext = openssl_encrypt(mode.cipher(), key, Some(&iv[..]), plain)?;
    let mut out = Vec::with_capacity(BLOCK_SIZE + ciphertext.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

//--------------------------------------------------------------------------------------------------
/// Decrypts `IV(16) || ciphertext`.  Truncated input, bad padding or any
/// OpenSSL failure reports `DecryptError`.
pub fn decrypt(data: &[u8], key: &[u8], mode: AesMode) -> Result<Vec<u8>, OptionBridgeError> {
    check_key_len(key, mode)?;
    if data.len() < BLOCK_SIZE {
        return Err(OptionBridgeError::DecryptError(
            "ciphertext too short to contain an IV".to_string(),
        ));
    }
    let (iv, ciphertext) = data.split_at(BLOCK_SIZE);
    openssl_decrypt(mode.cipher(), key, Some(iv), ciphertext)
        .map_err(|_| OptionBridgeError::DecryptError("ciphertext failed to decrypt".to_string()))
}

//==================================================================================================
/// In-memory protection for the AES key.  The key is held XORed with a
/// random per-instance mask; plaintext key bytes exist only inside
/// `with_key` and are wiped before it returns.
pub struct SecureKey {
    masked_key: [u8; MAX_KEY_LEN],
    xor_mask: [u8; MAX_KEY_LEN],
    key_len: usize,
}

impl SecureKey {
    pub fn new() -> Result<Self, OptionBridgeError> {
        let mut xor_mask = [0u8; MAX_KEY_LEN];
        rand_bytes(&mut xor_mask)?;
        Ok(SecureKey {
            masked_key: [0u8; MAX_KEY_LEN],
            xor_mask,
            key_len: 0,
        })
    }

    //----------------------------------------------------------------------------------------------
    /// Installs a new key, replacing any previous one.  Lengths above
    /// `MAX_KEY_LEN` are truncated; mode/length validation is the store's
    /// responsibility.
    pub fn set_key(&mut self, key: &[u8]) {
        secure_clear(&mut self.masked_key);
        let len = key.len().min(MAX_KEY_LEN);
        for i in 0..len {
            self.masked_key[i] = key[i] ^ self.xor_mask[i];
        }
        self.key_len = len;
    }

    //----------------------------------------------------------------------------------------------
    pub fn key_len(&self) -> usize {
        self.key_len
    }

    //----------------------------------------------------------------------------------------------
    /// Runs `f` with the unmasked key.  The plaintext buffer is zeroed before
    /// this returns.
    pub fn with_key<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let mut plain = [0u8; MAX_KEY_LEN];
        for i in 0..self.key_len {
            plain[i] = self.masked_key[i] ^ self.xor_mask[i];
        }
        let result = f(&plain[..self.key_len]);
        secure_clear(&mut plain);
        result
    }
}

impl Drop for SecureKey {
    fn drop(&mut self) {
        secure_clear(&mut self.masked_key);
        secure_clear(&mut self.xor_mask);
    }
}

impl fmt::Debug for SecureKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // never print key material
        write!(f, "SecureKey(len = {})", self.key_len)
    }
}
