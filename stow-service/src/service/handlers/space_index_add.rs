use crate::service::dispatcher::HandlerOutcome;
use crate::service::Service;
use log::{info, warn};
use serde_cbor::Value;
use std::str::FromStr;
use stow_core::capability::decode_caveats;
use stow_core::capability::space_index::{AddCaveats, ADD_ABILITY, RETRIEVAL_AUTH_FACT};
use stow_core::foundation::{Result, UploadError};
use stow_core::ucan::{Capability, Cid, Delegation, Invocation};

/// `space/index/add`: forward an index claim to the indexer. The agent may
/// attach a `space/content/retrieve` delegation under the `retrievalAuth`
/// fact so the indexer can fetch the index blob from storage nodes that
/// require authorization. Indexing is best-effort; the agent always gets ok.
pub async fn space_index_add(
    service: &Service,
    capability: &Capability,
    invocation: &Invocation,
) -> Result<HandlerOutcome> {
    let caveats: AddCaveats = decode_caveats(ADD_ABILITY, &capability.nb)?;
    info!(
        "[space/index/add] space={} content={} index={}",
        capability.with, caveats.content, caveats.index
    );

    let indexer = match service.indexer() {
        Some(indexer) => indexer,
        None => {
            info!("[space/index/add] indexer not configured; acknowledging");
            return Ok(HandlerOutcome::ok_empty());
        }
    };

    let retrieval_auth = match extract_retrieval_auth(invocation) {
        Ok(delegation) => {
            info!("[space/index/add] extracted retrievalAuth delegation {}", delegation.link());
            Some(delegation)
        }
        Err(err) => {
            // Without auth the indexer falls back to public retrieval.
            info!("[space/index/add] no retrievalAuth in invocation: {}", err);
            None
        }
    };

    if let Err(err) = indexer
        .publish_index_claim(&capability.with, caveats.content, caveats.index, retrieval_auth.as_ref())
        .await
    {
        warn!("[space/index/add] indexer publish failed: {}", err);
    } else {
        info!("[space/index/add] published to indexer");
    }

    Ok(HandlerOutcome::ok_empty())
}

/// Find the `retrievalAuth` fact and open the delegation it links out of
/// the invocation's own block set.
fn extract_retrieval_auth(invocation: &Invocation) -> Result<Delegation> {
    let fact = invocation
        .facts()
        .get(RETRIEVAL_AUTH_FACT)
        .ok_or_else(|| UploadError::Message("retrievalAuth fact not found in invocation".to_string()))?;
    let link = match fact {
        Value::Text(text) => Cid::from_str(text)?,
        other => {
            return Err(UploadError::Message(format!("retrievalAuth fact is not a link: {:?}", other)));
        }
    };
    Delegation::read(&link, invocation.attached())
}
