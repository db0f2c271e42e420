//! Config blob encoding and the encryption seam.
//!
//! Stores hand serialized config blobs through a [`ConfigCipher`] before
//! they touch disk or the database. Applications plug in their cipher of
//! choice; the built-in [`SignedBlobCodec`] provides tamper-evident storage
//! (HMAC-SHA256 over the payload) rather than secrecy.

use crate::error::{BudError, BudResult};
use crate::store::ConfigMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

const TAG_LEN: usize = 32;

/// Transformation applied to config blobs at rest.
pub trait ConfigCipher: Send + Sync {
    /// Protect a serialized config blob.
    fn encrypt(&self, plaintext: &[u8]) -> BudResult<Vec<u8>>;

    /// Recover a serialized config blob.
    fn decrypt(&self, payload: &[u8]) -> BudResult<Vec<u8>>;
}

/// Tamper-evident blob codec: HMAC-SHA256 tag prepended to the payload.
///
/// Guards stored config against modification, not disclosure. Swap in a
/// real cipher implementation when stored config must stay confidential.
pub struct SignedBlobCodec {
    key: Vec<u8>,
}

impl SignedBlobCodec {
    /// Create a codec with the given signing key.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Generate a random 32-byte signing key.
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        key
    }

    fn mac(&self) -> BudResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|err| BudError::Encryption(err.to_string()))
    }
}

impl ConfigCipher for SignedBlobCodec {
    fn encrypt(&self, plaintext: &[u8]) -> BudResult<Vec<u8>> {
        let mut mac = self.mac()?;
        mac.update(plaintext);
        let tag = mac.finalize().into_bytes();

        let mut payload = Vec::with_capacity(TAG_LEN + plaintext.len());
        payload.extend_from_slice(&tag);
        payload.extend_from_slice(plaintext);
        Ok(payload)
    }

    fn decrypt(&self, payload: &[u8]) -> BudResult<Vec<u8>> {
        if payload.len() < TAG_LEN {
            return Err(BudError::Encryption("payload too short".to_string()));
        }

        let (tag, plaintext) = payload.split_at(TAG_LEN);
        let mut mac = self.mac()?;
        mac.update(plaintext);
        mac.verify_slice(tag)
            .map_err(|_| BudError::Encryption("signature mismatch".to_string()))?;

        Ok(plaintext.to_vec())
    }
}

pub(crate) fn encode_blob(
    cipher: Option<&Arc<dyn ConfigCipher>>,
    config: &ConfigMap,
) -> BudResult<String> {
    let json = serde_json::to_vec(config).map_err(|err| BudError::Serialization(err.to_string()))?;

    match cipher {
        Some(cipher) => Ok(URL_SAFE_NO_PAD.encode(cipher.encrypt(&json)?)),
        None => {
            String::from_utf8(json).map_err(|err| BudError::Serialization(err.to_string()))
        }
    }
}

pub(crate) fn decode_blob(
    cipher: Option<&Arc<dyn ConfigCipher>>,
    blob: &str,
) -> BudResult<ConfigMap> {
    let json = match cipher {
        Some(cipher) => {
            let payload = URL_SAFE_NO_PAD
                .decode(blob)
                .map_err(|err| BudError::Encryption(err.to_string()))?;
            cipher.decrypt(&payload)?
        }
        None => blob.as_bytes().to_vec(),
    };

    serde_json::from_slice(&json).map_err(|err| BudError::Serialization(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConfigMap {
        serde_json::json!({"transport": "smtp", "port": 2525})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_plain_blob_round_trip() {
        let blob = encode_blob(None, &config()).unwrap();
        assert!(blob.contains("smtp"));
        assert_eq!(decode_blob(None, &blob).unwrap(), config());
    }

    #[test]
    fn test_signed_blob_round_trip() {
        let cipher: Arc<dyn ConfigCipher> =
            Arc::new(SignedBlobCodec::new(SignedBlobCodec::generate_key()));

        let blob = encode_blob(Some(&cipher), &config()).unwrap();
        assert!(!blob.contains("smtp"));
        assert_eq!(decode_blob(Some(&cipher), &blob).unwrap(), config());
    }

    #[test]
    fn test_tampered_blob_is_rejected() {
        let cipher: Arc<dyn ConfigCipher> = Arc::new(SignedBlobCodec::new(b"key".to_vec()));
        let codec = SignedBlobCodec::new(b"key".to_vec());

        let mut payload = codec.encrypt(b"{\"a\":1}").unwrap();
        let last = payload.len() - 1;
        payload[last] ^= 0xFF;

        let blob = URL_SAFE_NO_PAD.encode(&payload);
        assert!(matches!(
            decode_blob(Some(&cipher), &blob),
            Err(BudError::Encryption(_))
        ));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let signer = SignedBlobCodec::new(b"key-one".to_vec());
        let payload = signer.encrypt(b"data").unwrap();

        let verifier = SignedBlobCodec::new(b"key-two".to_vec());
        assert!(verifier.decrypt(&payload).is_err());
    }
}
