use crate::client::connection::UcanConnection;
use log::{debug, info};
use serde_cbor::Value;
use stow_core::capability::assert::{IndexCaveats, INDEX_ABILITY};
use stow_core::capability::claim::{CacheCaveats, Provider, CACHE_ABILITY};
use stow_core::capability::encode_caveats;
use stow_core::capability::space_index::{RETRIEVAL_AUTH_FACT, RETRIEVE_ABILITY};
use stow_core::foundation::{Result, UploadError};
use stow_core::ucan::{Capability, Cid, Delegation, Did, Invocation, Receipt, UcanSigner};
use url::Url;

/// UCAN client for the indexer service: publishes index claims and caches
/// location claims so uploaded content becomes discoverable.
pub struct IndexerClient {
    indexer_did: Did,
    signer: UcanSigner,
    connection: UcanConnection,
}

impl IndexerClient {
    pub fn new(endpoint: Url, indexer_did: Did, signer: UcanSigner) -> Self {
        let connection = UcanConnection::new(endpoint);
        Self { indexer_did, signer, connection }
    }

    pub fn indexer_did(&self) -> &Did {
        &self.indexer_did
    }

    /// Publish `assert/index` for `content`/`index`. When the agent supplied
    /// a `space/content/retrieve` delegation, its capabilities are
    /// re-delegated from this service to the indexer with the same caveats,
    /// carrying the client's proof chain forward so the indexer can prove
    /// authority to the storage node.
    pub async fn publish_index_claim(
        &self,
        space: &str,
        content: Cid,
        index: Cid,
        retrieval_auth: Option<&Delegation>,
    ) -> Result<()> {
        let caveats = IndexCaveats { content, index };
        // assert/* invocations are self-issued: the resource is our own DID.
        let mut builder = Invocation::build(&self.signer, self.indexer_did.clone()).capability(Capability::new(
            INDEX_ABILITY,
            self.signer.did().to_string(),
            encode_caveats(INDEX_ABILITY, &caveats)?,
        ));

        if let Some(client_auth) = retrieval_auth {
            let granted = client_auth
                .capabilities()
                .first()
                .ok_or_else(|| UploadError::caveats_invalid(RETRIEVE_ABILITY, "no capabilities in retrieval auth"))?;
            let redelegation = Delegation::build(&self.signer, self.indexer_did.clone())
                .capability(Capability::new(RETRIEVE_ABILITY, space, granted.nb.clone()))
                .proof(client_auth.clone())
                .issue()?;
            debug!(
                "re-delegated retrieval auth to indexer link={} client_link={}",
                redelegation.link(),
                client_auth.link()
            );
            builder = builder
                .fact(RETRIEVAL_AUTH_FACT, Value::Text(redelegation.link().to_string()))
                .proof(redelegation);
        }

        let invocation = builder.issue()?;
        let receipt = self.execute_checked(INDEX_ABILITY, &invocation).await?;
        info!("published index claim receipt={}", receipt.link());
        Ok(())
    }

    /// Cache a location claim with the indexer, naming the provider's
    /// retrieval addresses. The claim delegation rides along as proof.
    pub async fn cache_location_claim(&self, claim: &Delegation, provider_addrs: Vec<String>) -> Result<()> {
        for addr in &provider_addrs {
            debug!("caching location claim={} provider_addr={}", claim.link(), addr);
        }
        let caveats = CacheCaveats {
            claim: claim.link().clone(),
            provider: Provider { addresses: provider_addrs },
        };
        let invocation = Invocation::build(&self.signer, self.indexer_did.clone())
            .capability(Capability::new(
                CACHE_ABILITY,
                self.signer.did().to_string(),
                encode_caveats(CACHE_ABILITY, &caveats)?,
            ))
            .proof(claim.clone())
            .issue()?;
        let receipt = self.execute_checked(CACHE_ABILITY, &invocation).await?;
        info!("cached location claim={} receipt={}", claim.link(), receipt.link());
        Ok(())
    }

    async fn execute_checked(&self, operation: &str, invocation: &Invocation) -> Result<Receipt> {
        let receipt = self.connection.execute(invocation).await?;
        if !receipt.out().is_ok() {
            return Err(UploadError::upstream(operation, receipt.out().failure_message()));
        }
        Ok(receipt)
    }
}
