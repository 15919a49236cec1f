use crate::foundation::{Result, UploadError};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

const CID_VERSION: u8 = 0x01;
const DAG_CBOR_CODEC: u8 = 0x71;
const SHA2_256_CODE: u8 = 0x12;
const SHA2_256_LEN: u8 = 0x20;
const MULTIBASE_HEX: char = 'f';

/// Content address of a canonically serialized block: CIDv1 over a SHA-256
/// multihash, rendered in multibase base16. Equal bytes yield equal links.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cid {
    bytes: Vec<u8>,
}

impl Cid {
    /// Compute the link of a serialized block.
    pub fn of(block: &[u8]) -> Self {
        let digest = Sha256::digest(block);
        let mut bytes = Vec::with_capacity(4 + digest.len());
        bytes.push(CID_VERSION);
        bytes.push(DAG_CBOR_CODEC);
        bytes.push(SHA2_256_CODE);
        bytes.push(SHA2_256_LEN);
        bytes.extend_from_slice(&digest);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The raw SHA-256 digest carried in the multihash.
    pub fn digest(&self) -> &[u8] {
        &self.bytes[4..]
    }

    /// Verify that `block` actually hashes to this link.
    pub fn verify(&self, block: &[u8]) -> Result<()> {
        let computed = Cid::of(block);
        if computed != *self {
            return Err(UploadError::BlockDigestMismatch {
                expected: self.to_string(),
                computed: computed.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", MULTIBASE_HEX, hex::encode(&self.bytes))
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self)
    }
}

impl FromStr for Cid {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix(MULTIBASE_HEX)
            .ok_or_else(|| UploadError::InvalidIdentifier(format!("unsupported multibase prefix in {:?}", s)))?;
        let bytes = hex::decode(body)?;
        if bytes.len() != 36 || bytes[0] != CID_VERSION || bytes[2] != SHA2_256_CODE || bytes[3] != SHA2_256_LEN {
            return Err(UploadError::InvalidIdentifier(format!("malformed CID {:?}", s)));
        }
        Ok(Self { bytes })
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

struct CidVisitor;

impl Visitor<'_> for CidVisitor {
    type Value = Cid;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a multibase-encoded CID string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Cid, E> {
        Cid::from_str(value).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_str(CidVisitor)
    }
}
