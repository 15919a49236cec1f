use crate::client::connection::UcanConnection;
use log::debug;
use std::sync::Arc;
use stow_core::capability::blob::{
    AcceptCaveats, AcceptOk, AllocateCaveats, AllocateOk, ACCEPT_ABILITY, ALLOCATE_ABILITY,
};
use stow_core::capability::{decode_caveats, encode_caveats, BlobRef};
use stow_core::foundation::util::time::{expiry_after, DAY_SECS};
use stow_core::foundation::{Result, UploadError};
use stow_core::ucan::{Capability, Cid, Delegation, Did, Invocation, Promise, Receipt, UcanSigner};
use url::Url;

/// Fetches the service→node delegation proof on demand. Returning `None`
/// is not an error; the invocation simply goes out without a proof.
pub trait DelegationFetcher: Send + Sync {
    fn get_delegation(&self, provider_did: &str) -> Result<Option<Delegation>>;
}

pub struct AllocateRequest {
    pub space: String,
    pub blob: BlobRef,
    /// Link of the `space/blob/add` invocation that caused the allocation.
    pub cause: Cid,
}

pub struct AcceptRequest {
    pub space: String,
    pub blob: BlobRef,
    /// Link of the `http/put` invocation that uploaded the blob.
    pub put: Cid,
}

/// UCAN client for one storage node. Delegation proofs are fetched fresh
/// per request so the client tracks the provider table without restarts.
pub struct StorageNodeClient {
    endpoint: Url,
    node_did: Did,
    signer: UcanSigner,
    connection: UcanConnection,
    fetcher: Arc<dyn DelegationFetcher>,
}

impl StorageNodeClient {
    pub fn new(endpoint: Url, node_did: Did, signer: UcanSigner, fetcher: Arc<dyn DelegationFetcher>) -> Self {
        let connection = UcanConnection::new(endpoint.clone());
        Self { endpoint, node_did, signer, connection, fetcher }
    }

    pub fn node_did(&self) -> &Did {
        &self.node_did
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn fetch_proof(&self) -> Result<Option<Delegation>> {
        let proof = self.fetcher.get_delegation(&self.node_did.to_string())?;
        match &proof {
            Some(delegation) => debug!(
                "fetched delegation for node={} issuer={} audience={}",
                self.node_did,
                delegation.issuer(),
                delegation.audience()
            ),
            None => debug!("no delegation found for node={}", self.node_did),
        }
        Ok(proof)
    }

    /// Issue `blob/allocate`. Returns the decoded payload together with the
    /// invocation sent and the node's receipt, both needed downstream for
    /// effects and promises.
    pub async fn allocate(&self, request: &AllocateRequest) -> Result<(AllocateOk, Invocation, Receipt)> {
        let caveats = AllocateCaveats {
            space: request.space.clone(),
            blob: request.blob.clone(),
            cause: request.cause.clone(),
        };
        let mut builder = Invocation::build(&self.signer, self.node_did.clone())
            .capability(Capability::new(
                ALLOCATE_ABILITY,
                self.node_did.to_string(),
                encode_caveats(ALLOCATE_ABILITY, &caveats)?,
            ))
            .expiration(expiry_after(DAY_SECS));
        if let Some(proof) = self.fetch_proof()? {
            builder = builder.proof(proof);
        }
        let invocation = builder.issue()?;

        let receipt = self.connection.execute(&invocation).await?;
        let out = receipt.out();
        if !out.is_ok() {
            return Err(UploadError::upstream(ALLOCATE_ABILITY, out.failure_message()));
        }
        let ok_value = out.ok.clone().unwrap_or(serde_cbor::Value::Null);
        let allocate_ok: AllocateOk = decode_caveats(ALLOCATE_ABILITY, &ok_value)?;
        Ok((allocate_ok, invocation, receipt))
    }

    /// Issue `blob/accept`. Built without an expiration so the invocation
    /// link is deterministic and matches the copy constructed for effects.
    pub async fn accept(&self, request: &AcceptRequest) -> Result<(AcceptOk, Receipt)> {
        let caveats = AcceptCaveats {
            space: request.space.clone(),
            blob: request.blob.clone(),
            put: Promise::new(".out.ok", request.put.clone()),
        };
        let mut builder = Invocation::build(&self.signer, self.node_did.clone()).capability(Capability::new(
            ACCEPT_ABILITY,
            self.node_did.to_string(),
            encode_caveats(ACCEPT_ABILITY, &caveats)?,
        ));
        if let Some(proof) = self.fetch_proof()? {
            builder = builder.proof(proof);
        }
        let invocation = builder.issue()?;

        let receipt = self.connection.execute(&invocation).await?;
        let out = receipt.out();
        if !out.is_ok() {
            return Err(UploadError::upstream(ACCEPT_ABILITY, out.failure_message()));
        }
        let ok_value = out.ok.clone().unwrap_or(serde_cbor::Value::Null);
        let accept_ok: AcceptOk = decode_caveats(ACCEPT_ABILITY, &ok_value)?;
        Ok((accept_ok, receipt))
    }
}
