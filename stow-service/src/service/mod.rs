pub mod dispatcher;
pub mod handlers;

use crate::client::{IndexerClient, StorageNodeClient};
use crate::provider::ProviderDirectory;
use std::sync::Arc;
use stow_core::foundation::{Result, UploadError};
use stow_core::state::StateStore;
use stow_core::ucan::{DidResolver, UcanSigner};
use url::Url;

/// The upload coordination service: one signer, the state store, the
/// provider directory, and the optional indexer client. Storage-node
/// clients are created per request so provider registrations are picked up
/// dynamically.
pub struct Service {
    signer: UcanSigner,
    state: Arc<dyn StateStore>,
    directory: Arc<ProviderDirectory>,
    indexer: Option<Arc<IndexerClient>>,
    resolver: Arc<DidResolver>,
}

impl Service {
    pub fn new(signer: UcanSigner, state: Arc<dyn StateStore>, indexer: Option<IndexerClient>) -> Self {
        let directory = Arc::new(ProviderDirectory::new(state.clone()));
        let mut resolver = DidResolver::new();
        resolver.register_signer(&signer);
        Self {
            signer,
            state,
            directory,
            indexer: indexer.map(Arc::new),
            resolver: Arc::new(resolver),
        }
    }

    pub fn signer(&self) -> &UcanSigner {
        &self.signer
    }

    pub fn state(&self) -> &Arc<dyn StateStore> {
        &self.state
    }

    pub fn indexer(&self) -> Option<&Arc<IndexerClient>> {
        self.indexer.as_ref()
    }

    pub fn resolver(&self) -> &DidResolver {
        &self.resolver
    }

    /// A client for the currently selected storage node, or `None` when the
    /// provider table is empty.
    pub fn storage_client(&self) -> Result<Option<StorageNodeClient>> {
        let provider = match self.directory.select_provider()? {
            Some(provider) => provider,
            None => return Ok(None),
        };
        let endpoint = Url::parse(&provider.endpoint)
            .map_err(|err| UploadError::ConfigError(format!("provider endpoint {}: {}", provider.endpoint, err)))?;
        let node_did = provider
            .did
            .parse()
            .map_err(|err: UploadError| UploadError::ConfigError(format!("provider did {}: {}", provider.did, err)))?;
        Ok(Some(StorageNodeClient::new(
            endpoint,
            node_did,
            self.signer.clone(),
            self.directory.clone(),
        )))
    }
}
