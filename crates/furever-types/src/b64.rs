//! Serde adapter for binary fields (photos) carried as standard base64 text,
//! both on the wire and inside stored documents.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    serializer.serialize_str(&B64.encode(bytes.as_ref()))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    B64.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
}

pub fn decode(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    B64.decode(encoded.as_bytes())
}
