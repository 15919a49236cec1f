use crate::ucan::Cid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DELEGATE_ABILITY: &str = "access/delegate";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateCaveats {
    /// Delegation links keyed by their CID string.
    #[serde(default)]
    pub delegations: BTreeMap<String, Cid>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateOk {}
