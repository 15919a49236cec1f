use super::BlobRef;
use crate::ucan::Promise;
use serde::{Deserialize, Serialize};

pub const ADD_ABILITY: &str = "space/blob/add";
pub const REPLICATE_ABILITY: &str = "space/blob/replicate";

/// Caveats of `space/blob/add`. The space DID rides in the capability's
/// `with` resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCaveats {
    pub blob: BlobRef,
}

/// Success payload: a promise for the location-claim link in the eventual
/// `blob/accept` receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOk {
    pub site: Promise,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicateCaveats {
    pub blob: BlobRef,
    pub replicas: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicateOk {}
