use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::errors::{LauncherError, Result};

/// Passphrase the launcher has always shipped with.
pub const DEFAULT_STORE_PASSPHRASE: &str = "selvania-launcher-key";
/// Header in front of every sealed dataset.
pub const SEALED_HEADER: &str = "YSDB1:";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Clone, PartialEq, Eq)]
pub struct StoreKey([u8; KEY_LEN]);

impl StoreKey {
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = [0_u8; KEY_LEN];
        key.copy_from_slice(&digest[..KEY_LEN]);
        Self(key)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl Default for StoreKey {
    fn default() -> Self {
        Self::from_passphrase(DEFAULT_STORE_PASSPHRASE)
    }
}

impl fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoreKey(..)")
    }
}

pub fn encrypt_to_base64(key: &StoreKey, plaintext: &[u8]) -> Result<String> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = key
        .cipher()
        .encrypt(nonce, plaintext)
        .map_err(|_| LauncherError::Crypto("encryption failed".to_string()))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);

    Ok(base64::engine::general_purpose::STANDARD.encode(output))
}

pub fn decrypt_from_base64(key: &StoreKey, payload: &str) -> Result<Vec<u8>> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| LauncherError::Crypto("invalid base64 payload".to_string()))?;

    if decoded.len() <= NONCE_LEN {
        return Err(LauncherError::Crypto("payload too small".to_string()));
    }

    let (nonce_bytes, ciphertext) = decoded.split_at(NONCE_LEN);
    key.cipher()
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| LauncherError::Crypto("decryption failed".to_string()))
}

/// Encrypts `plaintext` into the on-disk text form `YSDB1:<base64>`.
pub fn seal(key: &StoreKey, plaintext: &[u8]) -> Result<String> {
    let body = encrypt_to_base64(key, plaintext)?;
    Ok(format!("{SEALED_HEADER}{body}"))
}

pub fn unseal(key: &StoreKey, contents: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(contents)
        .map_err(|_| LauncherError::Crypto("sealed payload is not utf-8".to_string()))?;
    let body = text
        .trim_start()
        .strip_prefix(SEALED_HEADER)
        .ok_or_else(|| LauncherError::Crypto("missing sealed header".to_string()))?;
    decrypt_from_base64(key, body)
}
