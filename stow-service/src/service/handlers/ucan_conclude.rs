use crate::client::{AcceptRequest, IndexerClient, StorageNodeClient};
use crate::peer;
use crate::service::dispatcher::HandlerOutcome;
use crate::service::Service;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use stow_core::capability::blob::{AcceptOk, ACCEPT_ABILITY};
use stow_core::capability::http::{PutCaveats, PUT_ABILITY};
use stow_core::capability::ucan_cap::{ConcludeCaveats, CONCLUDE_ABILITY};
use stow_core::capability::{decode_caveats, encode_caveats};
use stow_core::foundation::util::time::now_secs;
use stow_core::foundation::Result;
use stow_core::state::{Allocation, StateStore, StoredReceipt};
use stow_core::ucan::{Capability, Cid, Delegation, Effects, Invocation, OutResult, Receipt, UcanSigner};

const ACCEPT_TIMEOUT: Duration = Duration::from_secs(30);

/// `ucan/conclude`: the agent reports a signed receipt. Only `http/put`
/// conclusions drive the choreography forward; everything else is advisory
/// and gets a bare acknowledgement. Failures on this path still acknowledge
/// ok; the agent retries by re-concluding.
pub async fn ucan_conclude(
    service: &Service,
    capability: &Capability,
    invocation: &Invocation,
) -> Result<HandlerOutcome> {
    let caveats: ConcludeCaveats = decode_caveats(CONCLUDE_ABILITY, &capability.nb)?;
    info!("[ucan/conclude] received receipt {}", caveats.receipt);

    let receipt = match Receipt::read(&caveats.receipt, invocation.attached()) {
        Ok(receipt) => receipt,
        Err(err) => {
            warn!("[ucan/conclude] failed to read concluded receipt: {}", err);
            return Ok(HandlerOutcome::ok_empty());
        }
    };

    let ran_inv = match Invocation::read(receipt.ran(), invocation.attached()) {
        Ok(ran_inv) => ran_inv,
        Err(err) => {
            warn!("[ucan/conclude] receipt ran does not resolve to an invocation: {}", err);
            return Ok(HandlerOutcome::ok_empty());
        }
    };

    let put_capability = match ran_inv.capability() {
        Ok(put_capability) if put_capability.can == PUT_ABILITY => put_capability.clone(),
        Ok(other) => {
            info!("[ucan/conclude] receipt is for ability {}; acknowledging", other.can);
            return Ok(HandlerOutcome::ok_empty());
        }
        Err(err) => {
            warn!("[ucan/conclude] ran invocation has no capabilities: {}", err);
            return Ok(HandlerOutcome::ok_empty());
        }
    };

    let put_caveats: PutCaveats = match decode_caveats(PUT_ABILITY, &put_capability.nb) {
        Ok(put_caveats) => put_caveats,
        Err(err) => {
            warn!("[ucan/conclude] failed to decode http/put caveats: {}", err);
            return Ok(HandlerOutcome::ok_empty());
        }
    };
    let digest_hex = put_caveats.body.digest_hex();
    info!("[ucan/conclude] http/put for digest={} size={}", digest_hex, put_caveats.body.size);

    let allocation = match service.state().get_allocation(&digest_hex) {
        Ok(Some(allocation)) => allocation,
        Ok(None) => {
            warn!("[ucan/conclude] allocation not found for digest={}", digest_hex);
            return Ok(HandlerOutcome::ok_empty());
        }
        Err(err) => {
            warn!("[ucan/conclude] error getting allocation: {}", err);
            return Ok(HandlerOutcome::ok_empty());
        }
    };
    let accept_link = match allocation.accept_inv_link.clone() {
        Some(accept_link) => accept_link,
        None => {
            // A racing space/blob/add has not finished writing; the agent
            // may retry by re-concluding.
            warn!("[ucan/conclude] allocation for digest={} has no accept link yet", digest_hex);
            return Ok(HandlerOutcome::ok_empty());
        }
    };

    let client = match service.storage_client() {
        Ok(Some(client)) => client,
        Ok(None) => {
            warn!("[ucan/conclude] no storage provider available");
            return Ok(HandlerOutcome::ok_empty());
        }
        Err(err) => {
            warn!("[ucan/conclude] failed to get storage client: {}", err);
            return Ok(HandlerOutcome::ok_empty());
        }
    };
    if client.node_did().to_string() != allocation.provider {
        info!(
            "[ucan/conclude] provider re-selected original={} current={}",
            allocation.provider,
            client.node_did()
        );
    }

    // The accept round-trip runs on its own task with its own deadline,
    // detached from the caller: the agent's request may complete or be
    // cancelled first, and concurrent conclusions must not starve each
    // other through cancellation cascades.
    let signer = service.signer().clone();
    let state = service.state().clone();
    let indexer = service.indexer().cloned();
    let ran_link = ran_inv.link().clone();
    let task = tokio::spawn(async move {
        match tokio::time::timeout(
            ACCEPT_TIMEOUT,
            accept_and_publish(client, signer, state, indexer, allocation, put_caveats, ran_link, accept_link),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("[ucan/conclude] accept round-trip failed: {}", err),
            Err(_) => warn!("[ucan/conclude] accept round-trip timed out"),
        }
    });
    if task.await.is_err() {
        warn!("[ucan/conclude] accept task panicked");
    }

    Ok(HandlerOutcome::ok_empty())
}

#[allow(clippy::too_many_arguments)]
async fn accept_and_publish(
    client: StorageNodeClient,
    signer: UcanSigner,
    state: Arc<dyn StateStore>,
    indexer: Option<Arc<IndexerClient>>,
    allocation: Allocation,
    put_caveats: PutCaveats,
    ran_link: Cid,
    accept_link: Cid,
) -> Result<()> {
    info!("[ucan/conclude] calling node blob/accept");
    let (accept_ok, node_receipt) = client
        .accept(&AcceptRequest {
            space: allocation.space.clone(),
            blob: put_caveats.body.clone(),
            put: ran_link,
        })
        .await?;
    info!("[ucan/conclude] accept succeeded site={}", accept_ok.site);

    // Indexing is best-effort: log and carry on.
    if let Some(indexer) = indexer {
        if let Err(err) = publish_location_claim(&indexer, &client, &accept_ok, &node_receipt).await {
            warn!("[ucan/conclude] failed to cache location claim: {}", err);
        }
    }

    // The node issued its receipt against its own accept invocation; the
    // agent is polling for the accept link handed out by space/blob/add.
    // Re-issue under that link to bridge the two task identities.
    let reissued = Receipt::issue(
        &signer,
        accept_link.clone(),
        OutResult::ok(encode_caveats(ACCEPT_ABILITY, &AcceptOk { site: accept_ok.site.clone() })?),
        Effects::default(),
        node_receipt.attached().clone(),
    )?;
    let task_key = accept_link.to_string();
    state.put_receipt(
        &task_key,
        StoredReceipt {
            task: accept_link,
            receipt: reissued,
            blocks: node_receipt.export(),
            added_at: now_secs(),
        },
    )?;
    info!("[ucan/conclude] stored accept receipt for task {}", task_key);
    Ok(())
}

async fn publish_location_claim(
    indexer: &IndexerClient,
    client: &StorageNodeClient,
    accept_ok: &AcceptOk,
    node_receipt: &Receipt,
) -> Result<()> {
    let location_claim = Delegation::read(&accept_ok.site, node_receipt.attached())?;
    let peer_id = peer::peer_id_for_did(client.node_did())?;
    let (blob_addr, claim_addr) = peer::provider_addresses(client.endpoint(), &peer_id);
    info!("[ucan/conclude] caching location claim with node peer id {}", peer_id);
    indexer.cache_location_claim(&location_claim, vec![blob_addr, claim_addr]).await
}
