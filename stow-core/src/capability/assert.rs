use crate::ucan::Cid;
use serde::{Deserialize, Serialize};

pub const INDEX_ABILITY: &str = "assert/index";

/// Self-issued assertion that `index` indexes `content`; the resource of an
/// `assert/*` invocation is the asserter's own DID.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCaveats {
    pub content: Cid,
    pub index: Cid,
}
