use crate::ucan::Cid;
use serde::{Deserialize, Serialize};

pub const CONCLUDE_ABILITY: &str = "ucan/conclude";

/// The concluded receipt's link; its blocks ride attached to the invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcludeCaveats {
    pub receipt: Cid,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcludeOk {}
