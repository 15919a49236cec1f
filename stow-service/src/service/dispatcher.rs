use super::handlers;
use super::Service;
use log::{debug, warn};
use stow_core::capability::{access, space_blob, space_index, ucan_cap};
use stow_core::foundation::{Result, UploadError};
use stow_core::ucan::validator::validate_invocation;
use stow_core::ucan::{BlockMap, Effects, Envelope, Invocation, OutResult, Receipt};

/// What a handler produced: the outcome to wrap in a receipt, fork effects,
/// and any blocks that must travel in the response envelope (effect
/// invocations, upstream receipts).
pub struct HandlerOutcome {
    pub out: OutResult,
    pub fx: Effects,
    pub blocks: BlockMap,
}

impl HandlerOutcome {
    pub fn ok(out: OutResult) -> Self {
        Self { out, fx: Effects::default(), blocks: BlockMap::new() }
    }

    pub fn ok_empty() -> Self {
        Self::ok(OutResult::ok_empty())
    }
}

/// Decode an inbound envelope, run every invocation through validation and
/// its handler, and wrap each outcome in a service-signed receipt. Always
/// produces a response envelope for a decodable request; per-invocation
/// failures ride inside their receipts.
pub async fn execute_envelope(service: &Service, body: &[u8]) -> Result<Vec<u8>> {
    let request = Envelope::decode(body)?;
    if request.invocations.is_empty() {
        return Err(UploadError::EnvelopeDecode("envelope carries no invocations".to_string()));
    }

    let mut response = Envelope::new();
    for link in &request.invocations {
        let invocation = Invocation::read(link, request.blocks())
            .map_err(|err| UploadError::EnvelopeDecode(err.to_string()))?;
        let outcome = dispatch(service, &invocation).await;
        let receipt = Receipt::issue(service.signer(), link.clone(), outcome.out, outcome.fx, BlockMap::new())?;
        response.add_receipt(link.clone(), &receipt);
        response.attach(&outcome.blocks);
    }
    response.encode()
}

async fn dispatch(service: &Service, invocation: &Invocation) -> HandlerOutcome {
    if let Err(err) = validate_invocation(invocation, service.resolver()) {
        warn!("invocation rejected link={} error={}", invocation.link(), err);
        return HandlerOutcome::ok(OutResult::failure(err.to_string()));
    }

    let capability = match invocation.capability() {
        Ok(capability) => capability.clone(),
        Err(err) => return HandlerOutcome::ok(OutResult::failure(err.to_string())),
    };
    debug!("dispatching ability={} with={} link={}", capability.can, capability.with, invocation.link());

    let outcome = match capability.can.as_str() {
        space_blob::ADD_ABILITY => handlers::space_blob_add(service, &capability, invocation).await,
        ucan_cap::CONCLUDE_ABILITY => handlers::ucan_conclude(service, &capability, invocation).await,
        space_index::ADD_ABILITY => handlers::space_index_add(service, &capability, invocation).await,
        access::DELEGATE_ABILITY => handlers::access_delegate(service, &capability, invocation).await,
        space_blob::REPLICATE_ABILITY => handlers::space_blob_replicate(service, &capability, invocation).await,
        other => Err(UploadError::Message(format!("capability {} is not provided by this service", other))),
    };

    match outcome {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!("handler failed ability={} link={} error={}", capability.can, invocation.link(), err);
            HandlerOutcome::ok(OutResult::failure(err.to_string()))
        }
    }
}
