use crate::service::dispatcher::HandlerOutcome;
use crate::service::Service;
use log::info;
use stow_core::capability::decode_caveats;
use stow_core::capability::space_blob::{ReplicateCaveats, REPLICATE_ABILITY};
use stow_core::foundation::Result;
use stow_core::ucan::{Capability, Invocation};

/// `space/blob/replicate`: acknowledged for protocol completeness;
/// replication beyond acknowledgement is out of scope.
pub async fn space_blob_replicate(
    _service: &Service,
    capability: &Capability,
    _invocation: &Invocation,
) -> Result<HandlerOutcome> {
    let caveats: ReplicateCaveats = decode_caveats(REPLICATE_ABILITY, &capability.nb)?;
    info!(
        "[space/blob/replicate] space={} digest={} replicas={}",
        capability.with,
        caveats.blob.digest_hex(),
        caveats.replicas
    );
    Ok(HandlerOutcome::ok_empty())
}
