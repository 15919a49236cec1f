use crate::foundation::{Result, UploadError};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const KEY_PREFIX: &str = "did:key:";
const WEB_PREFIX: &str = "did:web:";
const MULTIBASE_HEX: char = 'f';
// multicodec ed25519-pub
const ED25519_PUB_CODE: [u8; 2] = [0xed, 0x01];

/// Decentralized identifier. `did:key` embeds an ed25519 public key
/// (multibase base16 of the multicodec-prefixed key bytes); `did:web`
/// names a host whose DID document must be resolved out of band.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Did {
    Key([u8; 32]),
    Web(String),
}

impl Did {
    pub fn from_public_key(key: [u8; 32]) -> Self {
        Did::Key(key)
    }

    pub fn web(host: impl Into<String>) -> Self {
        Did::Web(host.into())
    }

    /// The embedded ed25519 public key, if this is a `did:key`.
    pub fn public_key(&self) -> Option<[u8; 32]> {
        match self {
            Did::Key(key) => Some(*key),
            Did::Web(_) => None,
        }
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Did::Key(key) => {
                let mut body = Vec::with_capacity(2 + key.len());
                body.extend_from_slice(&ED25519_PUB_CODE);
                body.extend_from_slice(key);
                write!(f, "{}{}{}", KEY_PREFIX, MULTIBASE_HEX, hex::encode(body))
            }
            Did::Web(host) => write!(f, "{}{}", WEB_PREFIX, host),
        }
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({})", self)
    }
}

impl FromStr for Did {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(body) = s.strip_prefix(KEY_PREFIX) {
            let body = body
                .strip_prefix(MULTIBASE_HEX)
                .ok_or_else(|| UploadError::InvalidDid(format!("unsupported multibase prefix in {:?}", s)))?;
            let bytes = hex::decode(body).map_err(|err| UploadError::InvalidDid(err.to_string()))?;
            if bytes.len() != 34 || bytes[..2] != ED25519_PUB_CODE {
                return Err(UploadError::InvalidDid(format!("not an ed25519 did:key: {:?}", s)));
            }
            let mut key = [0u8; 32];
            key.copy_from_slice(&bytes[2..]);
            return Ok(Did::Key(key));
        }
        if let Some(host) = s.strip_prefix(WEB_PREFIX) {
            if host.is_empty() {
                return Err(UploadError::InvalidDid("empty did:web host".to_string()));
            }
            return Ok(Did::Web(host.to_string()));
        }
        Err(UploadError::InvalidDid(format!("unsupported DID method: {:?}", s)))
    }
}

impl Serialize for Did {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct DidVisitor;

impl Visitor<'_> for DidVisitor {
    type Value = Did;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a DID string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Did, E> {
        Did::from_str(value).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_str(DidVisitor)
    }
}
