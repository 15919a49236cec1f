use super::{BlobRef, UploadAddress};
use crate::ucan::{Cid, Promise};
use serde::{Deserialize, Serialize};

pub const ALLOCATE_ABILITY: &str = "blob/allocate";
pub const ACCEPT_ABILITY: &str = "blob/accept";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateCaveats {
    pub space: String,
    pub blob: BlobRef,
    /// Link of the `space/blob/add` invocation that triggered the allocation.
    pub cause: Cid,
}

/// `address` is absent when the node already holds the blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateOk {
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<UploadAddress>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptCaveats {
    pub space: String,
    pub blob: BlobRef,
    /// Promise for the `ok` payload of the agent's `http/put` receipt.
    pub put: Promise,
}

/// `site` links the location-claim delegation issued by the storage node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptOk {
    pub site: Cid,
}
