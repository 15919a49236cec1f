use crate::ucan::Cid;
use serde::{Deserialize, Serialize};

pub const ADD_ABILITY: &str = "space/index/add";
pub const RETRIEVE_ABILITY: &str = "space/content/retrieve";

/// Fact key carrying a link to a `space/content/retrieve` delegation in the
/// invocation's own block set.
pub const RETRIEVAL_AUTH_FACT: &str = "retrievalAuth";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCaveats {
    /// Root of the content the index describes.
    pub content: Cid,
    /// Link of the index blob itself.
    pub index: Cid,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOk {}
