// Per-user field encryption
// Each user gets a deterministic AES-256-GCM key derived from the process
// secret, so wrong-key or corrupted ciphertext always fails authentication
// instead of decrypting to garbage.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::GatewayError;

const NONCE_LEN: usize = 12;

/// Derive the per-user key: SHA-256(secret || user_id). Deterministic, and
/// distinct per user under the same secret.
pub fn derive_key(secret: &str, user_id: &str) -> Result<[u8; 32], GatewayError> {
    if secret.is_empty() {
        return Err(GatewayError::Configuration(
            "encryption secret is empty".to_string(),
        ));
    }
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(user_id.as_bytes());
    Ok(hasher.finalize().into())
}

/// Encrypts and decrypts individual string fields. Ciphertext is
/// base64(nonce || ct) so a single column holds everything.
pub struct FieldCipher {
    secret: String,
}

impl FieldCipher {
    pub fn new(secret: &str) -> Result<Self, GatewayError> {
        if secret.is_empty() {
            return Err(GatewayError::Configuration(
                "encryption secret is empty".to_string(),
            ));
        }
        Ok(Self {
            secret: secret.to_string(),
        })
    }

    fn cipher_for(&self, user_id: &str) -> Result<Aes256Gcm, GatewayError> {
        let key = derive_key(&self.secret, user_id)?;
        Aes256Gcm::new_from_slice(&key)
            .map_err(|e| GatewayError::Configuration(format!("cipher init failed: {}", e)))
    }

    /// Empty plaintext short-circuits to an empty ciphertext: no key
    /// material is exercised and nothing degenerate gets stored.
    pub fn encrypt(&self, user_id: &str, plaintext: &str) -> Result<String, GatewayError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let cipher = self.cipher_for(user_id)?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| GatewayError::Configuration("field encryption failed".to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(combined))
    }

    pub fn decrypt(&self, user_id: &str, ciphertext: &str) -> Result<String, GatewayError> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }
        let combined = STANDARD
            .decode(ciphertext)
            .map_err(|e| GatewayError::Decryption(format!("invalid encoding: {}", e)))?;
        if combined.len() <= NONCE_LEN {
            return Err(GatewayError::Decryption(
                "ciphertext too short".to_string(),
            ));
        }
        let (nonce_bytes, ct) = combined.split_at(NONCE_LEN);
        let cipher = self.cipher_for(user_id)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ct)
            .map_err(|_| GatewayError::Decryption("authentication failed".to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|e| GatewayError::Decryption(format!("invalid UTF-8: {}", e)))
    }

    /// True when the ciphertext decrypts under this user's key to a
    /// non-empty string. All decryption errors collapse into false.
    pub fn validate_decryption(&self, user_id: &str, ciphertext: &str) -> bool {
        match self.decrypt(user_id, ciphertext) {
            Ok(plaintext) => !plaintext.is_empty(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> FieldCipher {
        FieldCipher::new("unit-test-secret").unwrap()
    }

    #[test]
    fn derive_key_is_deterministic_and_per_user() {
        let a1 = derive_key("s", "u1").unwrap();
        let a2 = derive_key("s", "u1").unwrap();
        let b = derive_key("s", "u2").unwrap();
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }

    #[test]
    fn derive_key_rejects_empty_secret() {
        assert!(matches!(
            derive_key("", "u1"),
            Err(GatewayError::Configuration(_))
        ));
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let c = cipher();
        let ct = c.encrypt("u1", "session went well").unwrap();
        assert_ne!(ct, "session went well");
        assert_eq!(c.decrypt("u1", &ct).unwrap(), "session went well");
    }

    #[test]
    fn empty_string_short_circuits() {
        let c = cipher();
        assert_eq!(c.encrypt("u1", "").unwrap(), "");
        assert_eq!(c.decrypt("u1", "").unwrap(), "");
    }

    #[test]
    fn ciphertext_differs_between_users() {
        let c = cipher();
        let ct1 = c.encrypt("u1", "same text").unwrap();
        let ct2 = c.encrypt("u2", "same text").unwrap();
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn wrong_user_fails_authentication() {
        let c = cipher();
        let ct = c.encrypt("u1", "private note").unwrap();
        assert!(matches!(
            c.decrypt("u2", &ct),
            Err(GatewayError::Decryption(_))
        ));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let c = cipher();
        let ct = c.encrypt("u1", "private note").unwrap();
        let mut bytes = STANDARD.decode(&ct).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = STANDARD.encode(bytes);
        assert!(matches!(
            c.decrypt("u1", &tampered),
            Err(GatewayError::Decryption(_))
        ));
    }

    #[test]
    fn validate_decryption_swallows_errors() {
        let c = cipher();
        let ct = c.encrypt("u1", "note").unwrap();
        assert!(c.validate_decryption("u1", &ct));
        assert!(!c.validate_decryption("u2", &ct));
        assert!(!c.validate_decryption("u1", "not-even-base64!!"));
        assert!(!c.validate_decryption("u1", ""));
    }
}
