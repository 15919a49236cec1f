use super::BlobRef;
use crate::ucan::Promise;
use serde::{Deserialize, Serialize};

pub const PUT_ABILITY: &str = "http/put";

/// Fact key under which the transient signer's key material rides so the
/// agent can re-sign the invocation when resuming an upload.
pub const KEYS_FACT: &str = "keys";

/// `url` and `headers` are promises into the `blob/allocate` receipt; only
/// the body is known when the invocation is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutCaveats {
    pub url: Promise,
    pub headers: Promise,
    pub body: BlobRef,
}
