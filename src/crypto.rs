//! Credential encryption module using AES-256-GCM
//!
//! Community backing-store credential bundles are opaque JSON blobs that
//! must never be stored in the clear. This module encrypts them with
//! AES-256-GCM, binding each ciphertext to its community slug through
//! additional authenticated data (AAD) so a bundle cannot be replayed
//! against a different community.

#![allow(deprecated)]

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

const VERSION_ENCRYPTED: u8 = 0x01;
const VERSION_FIELD_LEN: usize = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const MIN_ENCRYPTED_LEN: usize = VERSION_FIELD_LEN + NONCE_LEN + TAG_LEN;

/// Crypto error types
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("invalid ciphertext format")]
    InvalidFormat,
    #[error("empty ciphertext")]
    EmptyCiphertext,
}

/// Secure wrapper for encryption keys with zeroization
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub struct ZeroizingKey(Vec<u8>);

/// Type alias for crypto keys
pub type CryptoKey = ZeroizingKey;

impl CryptoKey {
    /// Create a new crypto key from bytes
    pub fn new(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::EncryptionFailed(
                "Invalid key length: expected 32 bytes".to_string(),
            ));
        }
        Ok(ZeroizingKey(bytes))
    }

    /// Get the key as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Encrypt bytes using AES-256-GCM
pub fn encrypt_bytes(
    key: &CryptoKey,
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher_key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
    let cipher = Aes256Gcm::new(cipher_key);

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    // Prepend version byte and nonce to ciphertext
    let mut result = Vec::with_capacity(VERSION_FIELD_LEN + NONCE_LEN + ciphertext.len());
    result.push(VERSION_ENCRYPTED);
    result.extend_from_slice(&nonce);
    result.append(&mut ciphertext);

    Ok(result)
}

/// Decrypt bytes using AES-256-GCM
pub fn decrypt_bytes(
    key: &CryptoKey,
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() {
        return Err(CryptoError::EmptyCiphertext);
    }

    // Detect legacy plaintext payloads (no version marker)
    if ciphertext[0] != VERSION_ENCRYPTED {
        return Ok(ciphertext.to_vec());
    }

    // Validate minimum length (version + nonce + tag)
    if ciphertext.len() < MIN_ENCRYPTED_LEN {
        return Err(CryptoError::InvalidFormat);
    }

    let nonce = Nonce::from_slice(&ciphertext[VERSION_FIELD_LEN..VERSION_FIELD_LEN + NONCE_LEN]);
    let tag_and_ct = &ciphertext[VERSION_FIELD_LEN + NONCE_LEN..];

    debug_assert!(tag_and_ct.len() >= TAG_LEN);

    let cipher_key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
    let cipher = Aes256Gcm::new(cipher_key);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: tag_and_ct,
                aad,
            },
        )
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

/// Determine if a payload is using the encrypted format
pub fn is_encrypted_payload(ciphertext: &[u8]) -> bool {
    ciphertext.len() >= MIN_ENCRYPTED_LEN && ciphertext[0] == VERSION_ENCRYPTED
}

/// Encrypt a community credential bundle, binding it to the community slug.
pub fn encrypt_community_credentials(
    key: &CryptoKey,
    community_slug: &str,
    credentials: &serde_json::Value,
) -> Result<Vec<u8>, CryptoError> {
    let plaintext = serde_json::to_vec(credentials)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    encrypt_bytes(key, community_slug.as_bytes(), &plaintext)
}

/// Decrypt a community credential bundle previously bound to this slug.
pub fn decrypt_community_credentials(
    key: &CryptoKey,
    community_slug: &str,
    ciphertext: &[u8],
) -> Result<serde_json::Value, CryptoError> {
    let plaintext = decrypt_bytes(key, community_slug.as_bytes(), ciphertext)?;

    serde_json::from_slice(&plaintext)
        .map_err(|e| CryptoError::DecryptionFailed(format!("Invalid JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_key() -> CryptoKey {
        CryptoKey::new(vec![0u8; 32]).expect("valid test key")
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let aad = b"test-aad";
        let plaintext = b"secret message";

        let encrypted = encrypt_bytes(&key, aad, plaintext).expect("encryption succeeds");
        let decrypted = decrypt_bytes(&key, aad, &encrypted).expect("decryption succeeds");

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_different_aad_fails() {
        let key = test_key();
        let aad1 = b"test-aad-1";
        let aad2 = b"test-aad-2";
        let plaintext = b"secret message";

        let encrypted = encrypt_bytes(&key, aad1, plaintext).expect("encryption succeeds");
        let result = decrypt_bytes(&key, aad2, &encrypted);

        assert!(result.is_err());
    }

    #[test]
    fn test_modified_ciphertext_fails() {
        let key = test_key();
        let aad = b"test-aad";
        let plaintext = b"secret message";

        let mut encrypted = encrypt_bytes(&key, aad, plaintext).expect("encryption succeeds");
        // Modify a byte in the ciphertext
        encrypted[13] ^= 0x01;

        let result = decrypt_bytes(&key, aad, &encrypted);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_plaintext_works() {
        let key = test_key();
        let aad = b"test-aad";
        let plaintext = b"";

        let encrypted = encrypt_bytes(&key, aad, plaintext).expect("encryption succeeds");
        let decrypted = decrypt_bytes(&key, aad, &encrypted).expect("decryption succeeds");

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_nonce_uniqueness() {
        let key = test_key();
        let aad = b"test-aad";
        let plaintext = b"secret message";

        let encrypted1 = encrypt_bytes(&key, aad, plaintext).expect("encryption succeeds");
        let encrypted2 = encrypt_bytes(&key, aad, plaintext).expect("encryption succeeds");

        // Nonces (bytes 1-13) should be different
        assert_ne!(&encrypted1[1..13], &encrypted2[1..13]);
        // But both should decrypt correctly
        let decrypted1 = decrypt_bytes(&key, aad, &encrypted1).expect("decryption succeeds");
        let decrypted2 = decrypt_bytes(&key, aad, &encrypted2).expect("decryption succeeds");
        assert_eq!(decrypted1, plaintext);
        assert_eq!(decrypted2, plaintext);
    }

    #[test]
    fn test_legacy_payload_passthrough() {
        let key = test_key();
        let aad = b"test-aad";
        let legacy_ciphertext = b"legacy-bundle".to_vec(); // No version marker

        let result =
            decrypt_bytes(&key, aad, &legacy_ciphertext).expect("legacy plaintext is returned");
        assert_eq!(result, legacy_ciphertext);
    }

    #[test]
    fn test_is_encrypted_payload_detection() {
        let key = test_key();
        let aad = b"test-aad";
        let encrypted = encrypt_bytes(&key, aad, b"secret").expect("encryption succeeds");

        assert!(is_encrypted_payload(&encrypted));
        assert!(!is_encrypted_payload(b"legacy"));
    }

    #[test]
    fn test_community_credentials_roundtrip() {
        let key = test_key();
        let bundle = json!({
            "apiKey": "AIza-example",
            "projectId": "sunrise-court",
            "storageBucket": "sunrise-court.example.com"
        });

        let ciphertext = encrypt_community_credentials(&key, "sunrise-court", &bundle)
            .expect("encryption succeeds");
        let decrypted = decrypt_community_credentials(&key, "sunrise-court", &ciphertext)
            .expect("decryption succeeds");

        assert_eq!(decrypted, bundle);
    }

    #[test]
    fn test_community_credentials_bound_to_slug() {
        let key = test_key();
        let bundle = json!({"apiKey": "AIza-example"});

        let ciphertext = encrypt_community_credentials(&key, "sunrise-court", &bundle)
            .expect("encryption succeeds");

        // A different community slug must not be able to open the bundle.
        let result = decrypt_community_credentials(&key, "harbor-view", &ciphertext);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_key_length_rejected() {
        let result = CryptoKey::new(vec![0u8; 16]); // Too short
        assert!(result.is_err());

        let result = CryptoKey::new(vec![0u8; 64]); // Too long
        assert!(result.is_err());
    }

    #[test]
    fn test_insufficient_ciphertext_length() {
        let key = test_key();
        let aad = b"test-aad";
        let short_ciphertext = vec![VERSION_ENCRYPTED, 0x02]; // Too short for nonce + tag

        let result = decrypt_bytes(&key, aad, &short_ciphertext);
        assert!(matches!(result, Err(CryptoError::InvalidFormat)));
    }
}
