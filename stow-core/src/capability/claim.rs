use crate::ucan::Cid;
use serde::{Deserialize, Serialize};

pub const CACHE_ABILITY: &str = "claim/cache";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Multiaddr strings naming where the provider serves blobs and claims.
    pub addresses: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCaveats {
    /// Link of the location-claim delegation being cached.
    pub claim: Cid,
    pub provider: Provider,
}
