use crate::client::AllocateRequest;
use crate::service::dispatcher::HandlerOutcome;
use crate::service::Service;
use log::{info, warn};
use serde_cbor::Value;
use std::collections::BTreeMap;
use stow_core::capability::blob::{AcceptCaveats, ACCEPT_ABILITY};
use stow_core::capability::http::{PutCaveats, KEYS_FACT, PUT_ABILITY};
use stow_core::capability::space_blob::{AddCaveats, AddOk, ADD_ABILITY};
use stow_core::capability::ucan_cap::{ConcludeCaveats, CONCLUDE_ABILITY};
use stow_core::capability::{decode_caveats, encode_caveats};
use stow_core::foundation::util::time::{expiry_after, DAY_SECS};
use stow_core::foundation::{Result, UploadError};
use stow_core::state::{Allocation, StateStore as _};
use stow_core::ucan::{Capability, Effects, Invocation, OutResult, Promise, UcanSigner};

/// `space/blob/add`: allocate storage on a node, record the allocation, and
/// hand the agent an upload URL plus the remaining choreography as fork
/// effects. The `blob/accept` and `http/put` invocations built here are
/// expiration-free so their links stay deterministic; downstream promises
/// reference them by content address.
pub async fn space_blob_add(
    service: &Service,
    capability: &Capability,
    invocation: &Invocation,
) -> Result<HandlerOutcome> {
    let caveats: AddCaveats = decode_caveats(ADD_ABILITY, &capability.nb)?;
    let space = capability.with.clone();
    let digest_hex = caveats.blob.digest_hex();
    info!(
        "[space/blob/add] space={} digest={} size={}",
        space,
        digest_prefix(&digest_hex),
        caveats.blob.size
    );

    let client = service.storage_client()?.ok_or(UploadError::NoProvider)?;

    info!("[space/blob/add] calling node blob/allocate");
    let (allocate_ok, allocate_inv, allocate_receipt) = client
        .allocate(&AllocateRequest {
            space: space.clone(),
            blob: caveats.blob.clone(),
            cause: invocation.link().clone(),
        })
        .await?;
    info!(
        "[space/blob/add] allocate succeeded allocated_size={} requested_size={} inv={}",
        allocate_ok.size,
        caveats.blob.size,
        allocate_inv.link()
    );

    // The node omits the address when it already holds the blob; fall back
    // to the provider's default endpoint.
    let upload_url = match &allocate_ok.address {
        Some(address) => Some(address.url.clone()),
        None => match service.state().get_first_provider() {
            Ok(provider) => provider.map(|info| info.endpoint),
            Err(err) => {
                warn!("[space/blob/add] failed to get first provider: {}", err);
                None
            }
        },
    };

    let mut allocation = Allocation {
        space: space.clone(),
        digest: caveats.blob.digest.clone(),
        size: caveats.blob.size,
        cause: invocation.link().clone(),
        provider: client.node_did().to_string(),
        upload_url,
        accept_inv_link: None,
        expires_at: expiry_after(DAY_SECS),
    };
    service.state().put_allocation(&digest_hex, allocation.clone())?;

    // Transient identity for http/put; its private bytes ride in a fact so
    // the agent can re-sign the identical invocation when resuming.
    let blob_provider = UcanSigner::generate();
    let http_put = build_http_put(&blob_provider, &caveats, &allocate_receipt)?;

    let accept_inv = Invocation::build(service.signer(), client.node_did().clone())
        .capability(Capability::new(
            ACCEPT_ABILITY,
            client.node_did().to_string(),
            encode_caveats(
                ACCEPT_ABILITY,
                &AcceptCaveats {
                    space: space.clone(),
                    blob: caveats.blob.clone(),
                    put: Promise::new(".out.ok", http_put.link().clone()),
                },
            )?,
        ))
        .issue()?;

    // The accept link is the task id the agent will poll for; it must be on
    // the record before we answer.
    allocation.accept_inv_link = Some(accept_inv.link().clone());
    service.state().put_allocation(&digest_hex, allocation)?;

    let mut conclude_inv = Invocation::build(service.signer(), client.node_did().clone())
        .capability(Capability::new(
            CONCLUDE_ABILITY,
            space,
            encode_caveats(CONCLUDE_ABILITY, &ConcludeCaveats { receipt: allocate_receipt.link().clone() })?,
        ))
        .expiration(expiry_after(DAY_SECS))
        .issue()?;
    // the agent resolves the http/put promises against this receipt
    conclude_inv.attach_blocks(&allocate_receipt.export());

    let mut blocks = allocate_receipt.export();
    for effect in [&allocate_inv, &conclude_inv, &http_put, &accept_inv] {
        blocks.merge(&effect.export());
    }
    let fx = Effects::fork(vec![
        allocate_inv.link().clone(),
        conclude_inv.link().clone(),
        http_put.link().clone(),
        accept_inv.link().clone(),
    ]);

    let ok = AddOk { site: Promise::new(".out.ok.site", accept_inv.link().clone()) };
    info!("[space/blob/add] returning success accept_task={}", accept_inv.link());
    Ok(HandlerOutcome { out: OutResult::ok(encode_caveats(ADD_ABILITY, &ok)?), fx, blocks })
}

fn build_http_put(
    blob_provider: &UcanSigner,
    caveats: &AddCaveats,
    allocate_receipt: &stow_core::ucan::Receipt,
) -> Result<Invocation> {
    let provider_did = blob_provider.did();
    let mut keys = BTreeMap::new();
    keys.insert(
        Value::Text(provider_did.to_string()),
        Value::Bytes(blob_provider.seed_bytes().to_vec()),
    );
    let mut fact = BTreeMap::new();
    fact.insert(Value::Text("id".to_string()), Value::Text(provider_did.to_string()));
    fact.insert(Value::Text("keys".to_string()), Value::Map(keys));

    Invocation::build(blob_provider, provider_did.clone())
        .capability(Capability::new(
            PUT_ABILITY,
            provider_did.to_string(),
            encode_caveats(
                PUT_ABILITY,
                &PutCaveats {
                    url: Promise::new(".out.ok.address.url", allocate_receipt.link().clone()),
                    headers: Promise::new(".out.ok.address.headers", allocate_receipt.link().clone()),
                    body: caveats.blob.clone(),
                },
            )?,
        ))
        .fact(KEYS_FACT, Value::Map(fact))
        .issue()
}

fn digest_prefix(digest_hex: &str) -> &str {
    &digest_hex[..digest_hex.len().min(16)]
}
