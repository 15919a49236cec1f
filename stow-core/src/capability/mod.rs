pub mod access;
pub mod assert;
pub mod blob;
pub mod claim;
pub mod http;
pub mod space_blob;
pub mod space_index;
pub mod ucan_cap;

use crate::foundation::{Result, UploadError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_cbor::Value;

/// Blob identity: the multihash digest bytes and the byte size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub digest: Vec<u8>,
    pub size: u64,
}

impl BlobRef {
    pub fn digest_hex(&self) -> String {
        hex::encode(&self.digest)
    }
}

/// Where and how an agent must PUT blob bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAddress {
    pub url: String,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub headers: std::collections::BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,
}

pub fn encode_caveats<T: Serialize>(ability: &str, caveats: &T) -> Result<Value> {
    serde_cbor::value::to_value(caveats)
        .map_err(|err| UploadError::caveats_invalid(ability, err.to_string()))
}

pub fn decode_caveats<T: DeserializeOwned>(ability: &str, value: &Value) -> Result<T> {
    serde_cbor::value::from_value(value.clone())
        .map_err(|err| UploadError::caveats_invalid(ability, err.to_string()))
}
