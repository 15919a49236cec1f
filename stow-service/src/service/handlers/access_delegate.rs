use crate::service::dispatcher::HandlerOutcome;
use crate::service::Service;
use log::info;
use stow_core::capability::access::{DelegateCaveats, DELEGATE_ABILITY};
use stow_core::capability::decode_caveats;
use stow_core::foundation::Result;
use stow_core::ucan::{Capability, Invocation};

/// `access/delegate`: acknowledge receipt of the agent's delegations. A
/// production service would persist them for later retrieval.
pub async fn access_delegate(
    _service: &Service,
    capability: &Capability,
    invocation: &Invocation,
) -> Result<HandlerOutcome> {
    let caveats: DelegateCaveats = decode_caveats(DELEGATE_ABILITY, &capability.nb)?;
    info!(
        "[access/delegate] agent={} delegations={}",
        invocation.issuer(),
        caveats.delegations.len()
    );
    for link in caveats.delegations.values() {
        info!("[access/delegate] acknowledged delegation {}", link);
    }
    Ok(HandlerOutcome::ok_empty())
}
