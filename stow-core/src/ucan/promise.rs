use crate::ucan::cid::Cid;
use serde::{Deserialize, Serialize};

/// A late-binding reference into a receipt that does not exist yet: take the
/// value at `selector` from the `out` of whatever receipt eventually lands
/// for the invocation at `link`. Promises are transported verbatim and
/// resolved by the receiver, never by this service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Await {
    pub selector: String,
    pub link: Cid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promise {
    #[serde(rename = "ucan/await")]
    pub ucan_await: Await,
}

impl Promise {
    pub fn new(selector: impl Into<String>, link: Cid) -> Self {
        Self { ucan_await: Await { selector: selector.into(), link } }
    }
}

/// Side tasks attached to a receipt: invocations the receiver is expected to
/// execute or await in parallel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effects {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fork: Vec<Cid>,
}

impl Effects {
    pub fn fork(links: Vec<Cid>) -> Self {
        Self { fork: links }
    }

    pub fn is_empty(&self) -> bool {
        self.fork.is_empty()
    }
}
