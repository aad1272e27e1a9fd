use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const MATCH_KEY_LEN: usize = 32;

/// Per-match symmetric secret used to authenticate submissions.
///
/// Travels as standard base64. `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct MatchKey(Vec<u8>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchKeyError {
    Encoding(String),
    Length(usize),
}

impl fmt::Display for MatchKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKeyError::Encoding(msg) => write!(f, "Invalid match key encoding: {}", msg),
            MatchKeyError::Length(len) => {
                write!(f, "Match key must be {} bytes, got {}", MATCH_KEY_LEN, len)
            }
        }
    }
}

impl std::error::Error for MatchKeyError {}

impl MatchKey {
    /// 256 bits from the operating system CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; MATCH_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        MatchKey(bytes)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, MatchKeyError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| MatchKeyError::Encoding(e.to_string()))?;
        if bytes.len() != MATCH_KEY_LEN {
            return Err(MatchKeyError::Length(bytes.len()));
        }
        Ok(MatchKey(bytes))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    fn mac(&self) -> Option<HmacSha256> {
        // HMAC takes keys of any length; the error branch is unreachable in practice.
        HmacSha256::new_from_slice(&self.0).ok()
    }

    /// Lowercase hex HMAC-SHA256 of `payload`.
    pub fn sign(&self, payload: &str) -> Option<String> {
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    /// Constant-time check of a hex signature. Malformed hex never verifies.
    pub fn verify(&self, payload: &str, signature_hex: &str) -> bool {
        let Ok(signature) = hex::decode(signature_hex.trim()) else {
            return false;
        };
        let Some(mut mac) = self.mac() else {
            return false;
        };
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).is_ok()
    }
}

impl fmt::Debug for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MatchKey(<redacted>)")
    }
}

impl Serialize for MatchKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for MatchKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        MatchKey::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}
