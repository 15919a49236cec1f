use crate::client::storage_node::DelegationFetcher;
use log::debug;
use std::sync::Arc;
use stow_core::foundation::Result;
use stow_core::state::{ProviderInfo, StateStore};
use stow_core::ucan::Delegation;

/// Chooses storage nodes and serves their delegations out of the provider
/// table. The first registered provider wins; callers re-query per request
/// so newly registered nodes are picked up without a restart.
pub struct ProviderDirectory {
    state: Arc<dyn StateStore>,
}

impl ProviderDirectory {
    pub fn new(state: Arc<dyn StateStore>) -> Self {
        Self { state }
    }

    pub fn select_provider(&self) -> Result<Option<ProviderInfo>> {
        let provider = self.state.get_first_provider()?;
        if let Some(info) = &provider {
            debug!("selected provider did={} endpoint={}", info.did, info.endpoint);
        }
        Ok(provider)
    }
}

impl DelegationFetcher for ProviderDirectory {
    fn get_delegation(&self, provider_did: &str) -> Result<Option<Delegation>> {
        self.state.get_provider_delegation(provider_did)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stow_core::state::MemoryStateStore;

    #[test]
    fn selects_first_registered_provider() {
        let state: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let directory = ProviderDirectory::new(state.clone());
        assert!(directory.select_provider().expect("select").is_none());

        state
            .put_provider(
                "did:web:node",
                ProviderInfo { did: "did:web:node".to_string(), endpoint: "http://node".to_string(), delegation: None },
            )
            .expect("put");
        let selected = directory.select_provider().expect("select").expect("present");
        assert_eq!(selected.did, "did:web:node");
        assert!(directory.get_delegation("did:web:node").expect("fetch").is_none());
    }
}
