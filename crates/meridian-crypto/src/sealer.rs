//! Authenticated symmetric encryption of long-lived secrets at rest (§4.A).
//!
//! Serialization is kept intentionally ad-hoc — `hex(iv):hex(tag):hex(ct)` —
//! because already-written rows must remain readable; this is not migrated
//! silently (§9 design note).

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroize;

const KEY_BYTES: usize = 32;
const NONCE_BYTES: usize = 12;
const TAG_BYTES: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SealError {
    #[error("encryption key not configured")]
    MissingKey,
    #[error("encryption key must be exactly 32 bytes")]
    BadKeyLength,
    #[error("malformed ciphertext")]
    MalformedCiphertext,
    #[error("authentication failed")]
    AuthFailure,
}

/// The `iv:tag:ciphertext` hex triple, never displayed with its contents.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedSecret(String);

impl SealedSecret {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for SealedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealedSecret([REDACTED])")
    }
}

/// A 32-byte process-wide key. Zeroized on drop; `Debug` is redacted.
pub struct SealingKey([u8; KEY_BYTES]);

impl SealingKey {
    pub fn from_hex(hex_key: &str) -> Result<Self, SealError> {
        if hex_key.is_empty() {
            return Err(SealError::MissingKey);
        }
        let bytes = hex::decode(hex_key).map_err(|_| SealError::BadKeyLength)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SealError> {
        if bytes.len() != KEY_BYTES {
            return Err(SealError::BadKeyLength);
        }
        let mut key = [0u8; KEY_BYTES];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }
}

impl Drop for SealingKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealingKey([REDACTED])")
    }
}

/// Seals and opens secrets under one process-wide key.
pub struct CredentialSealer {
    key: SealingKey,
}

impl CredentialSealer {
    pub fn new(key: SealingKey) -> Self {
        Self { key }
    }

    /// Random 12-byte nonce per seal, 16-byte tag, no additional
    /// authenticated data.
    pub fn seal(&self, plaintext: &[u8]) -> Result<SealedSecret, SealError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key.0));

        let mut nonce_bytes = [0u8; NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let combined = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| SealError::AuthFailure)?;

        let (ciphertext, tag) = combined.split_at(combined.len() - TAG_BYTES);

        Ok(SealedSecret(format!(
            "{}:{}:{}",
            hex::encode(nonce_bytes),
            hex::encode(tag),
            hex::encode(ciphertext)
        )))
    }

    /// Refuses to open if nonce or tag length differ from the constants, or
    /// if the string isn't exactly three colon-separated components.
    pub fn open(&self, sealed: &SealedSecret) -> Result<Vec<u8>, SealError> {
        let parts: Vec<&str> = sealed.0.split(':').collect();
        if parts.len() != 3 {
            return Err(SealError::MalformedCiphertext);
        }
        let iv = hex::decode(parts[0]).map_err(|_| SealError::MalformedCiphertext)?;
        let tag = hex::decode(parts[1]).map_err(|_| SealError::MalformedCiphertext)?;
        let ciphertext = hex::decode(parts[2]).map_err(|_| SealError::MalformedCiphertext)?;

        if iv.len() != NONCE_BYTES || tag.len() != TAG_BYTES {
            return Err(SealError::MalformedCiphertext);
        }

        let mut combined = ciphertext;
        combined.extend_from_slice(&tag);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key.0));
        let nonce = Nonce::from_slice(&iv);

        cipher
            .decrypt(nonce, combined.as_ref())
            .map_err(|_| SealError::AuthFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealer() -> CredentialSealer {
        CredentialSealer::new(SealingKey::from_bytes(&[7u8; KEY_BYTES]).unwrap())
    }

    #[test]
    fn round_trip_open_of_seal_returns_original() {
        let s = sealer();
        let plaintext = b"super-secret-access-token";
        let sealed = s.seal(plaintext).unwrap();
        let opened = s.open(&sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn seal_is_nondeterministic() {
        let s = sealer();
        let a = s.seal(b"same plaintext").unwrap();
        let b = s.seal(b"same plaintext").unwrap();
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let s = sealer();
        let sealed = s.seal(b"hello world").unwrap();
        let parts: Vec<&str> = sealed.as_str().split(':').collect();
        let mut ct_bytes = hex::decode(parts[2]).unwrap();
        ct_bytes[0] ^= 0xFF;
        let tampered = SealedSecret::from_raw(format!("{}:{}:{}", parts[0], parts[1], hex::encode(ct_bytes)));
        assert_eq!(s.open(&tampered).unwrap_err(), SealError::AuthFailure);
    }

    #[test]
    fn tampered_tag_fails_auth() {
        let s = sealer();
        let sealed = s.seal(b"hello world").unwrap();
        let parts: Vec<&str> = sealed.as_str().split(':').collect();
        let mut tag_bytes = hex::decode(parts[1]).unwrap();
        tag_bytes[0] ^= 0xFF;
        let tampered = SealedSecret::from_raw(format!("{}:{}:{}", parts[0], hex::encode(tag_bytes), parts[2]));
        assert_eq!(s.open(&tampered).unwrap_err(), SealError::AuthFailure);
    }

    #[test]
    fn tampered_iv_fails_auth() {
        let s = sealer();
        let sealed = s.seal(b"hello world").unwrap();
        let parts: Vec<&str> = sealed.as_str().split(':').collect();
        let mut iv_bytes = hex::decode(parts[0]).unwrap();
        iv_bytes[0] ^= 0xFF;
        let tampered = SealedSecret::from_raw(format!("{}:{}:{}", hex::encode(iv_bytes), parts[1], parts[2]));
        assert_eq!(s.open(&tampered).unwrap_err(), SealError::AuthFailure);
    }

    #[test]
    fn malformed_triple_is_rejected() {
        let s = sealer();
        let bad = SealedSecret::from_raw("not-even-hex");
        assert_eq!(s.open(&bad).unwrap_err(), SealError::MalformedCiphertext);

        let wrong_iv_len = SealedSecret::from_raw(format!("{}:{}:{}", hex::encode([0u8; 4]), hex::encode([0u8; TAG_BYTES]), hex::encode([0u8; 8])));
        assert_eq!(s.open(&wrong_iv_len).unwrap_err(), SealError::MalformedCiphertext);
    }

    #[test]
    fn key_length_is_validated() {
        assert_eq!(SealingKey::from_bytes(&[0u8; 16]).unwrap_err(), SealError::BadKeyLength);
        assert_eq!(SealingKey::from_hex("").unwrap_err(), SealError::MissingKey);
    }

    #[test]
    fn large_payload_round_trips() {
        let s = sealer();
        let plaintext = vec![0x5Au8; 1024 * 1024];
        let sealed = s.seal(&plaintext).unwrap();
        assert_eq!(s.open(&sealed).unwrap(), plaintext);
    }
}
