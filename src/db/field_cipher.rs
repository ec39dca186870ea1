//! PII column encryption using ChaCha20-Poly1305
//!
//! The 256-bit key is derived once from the configured secret with Argon2id.
//! Every value gets a fresh random nonce and is stored as
//! base64(nonce || ciphertext), so equal plaintexts never produce equal
//! column values and encrypted columns cannot be filtered in SQL.

use anyhow::{Context, Result};
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    ChaCha20Poly1305, Key, Nonce,
};

/// Domain separation salt for the key derivation
const KEY_SALT: &[u8] = b"helpdesk.field-cipher.v1";
const NONCE_LEN: usize = 12;

pub struct FieldCipher {
    cipher: ChaCha20Poly1305,
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

impl FieldCipher {
    /// Derive the column key from a secret
    pub fn from_secret(secret: &str) -> Result<Self> {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(secret.as_bytes(), KEY_SALT, &mut key)
            .map_err(|e| anyhow::anyhow!("Key derivation failed: {}", e))?;

        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("Encryption failed: {}", e))?;

        let mut stored = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        stored.extend_from_slice(&nonce);
        stored.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(stored))
    }

    pub fn decrypt(&self, stored: &str) -> Result<String> {
        let bytes = BASE64
            .decode(stored)
            .context("Failed to decode encrypted column from base64")?;
        if bytes.len() < NONCE_LEN {
            anyhow::bail!("Encrypted column is too short: {} bytes", bytes.len());
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| anyhow::anyhow!("Decryption failed - wrong key or corrupted column"))?;

        String::from_utf8(plaintext).context("Decrypted column is not valid UTF-8")
    }

    pub fn encrypt_opt(&self, plaintext: Option<&str>) -> Result<Option<String>> {
        plaintext.map(|p| self.encrypt(p)).transpose()
    }

    pub fn decrypt_opt(&self, stored: Option<&str>) -> Result<Option<String>> {
        stored.map(|s| self.decrypt(s)).transpose()
    }
}
