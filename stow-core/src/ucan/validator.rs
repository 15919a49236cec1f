use crate::foundation::{Result, UploadError};
use crate::ucan::block::BlockMap;
use crate::ucan::delegation::{Capability, Delegation};
use crate::ucan::did::Did;
use crate::ucan::invocation::Invocation;
use crate::ucan::signer::DidResolver;
use log::debug;

const MAX_PROOF_DEPTH: usize = 10;

/// Verify an inbound invocation: its signature must check out against the
/// issuer DID, and for every capability the issuer must either own the
/// resource outright or hold a delegation chain (travelling in the attached
/// blocks) that grants it.
pub fn validate_invocation(invocation: &Invocation, resolver: &DidResolver) -> Result<()> {
    invocation.as_delegation().verify_signature(resolver)?;
    for capability in invocation.capabilities() {
        check_authority(
            invocation.issuer(),
            capability,
            invocation.as_delegation().proofs(),
            invocation.attached(),
            resolver,
            0,
        )?;
    }
    Ok(())
}

fn check_authority(
    issuer: &Did,
    requested: &Capability,
    proofs: &[crate::ucan::cid::Cid],
    blocks: &BlockMap,
    resolver: &DidResolver,
    depth: usize,
) -> Result<()> {
    // Owning the resource needs no proof.
    if requested.with == issuer.to_string() {
        return Ok(());
    }
    if depth >= MAX_PROOF_DEPTH {
        return Err(not_authorized(issuer, requested));
    }

    for link in proofs {
        let proof = match Delegation::read(link, blocks) {
            Ok(proof) => proof,
            Err(err) => {
                debug!("skipping unreadable proof link={} error={}", link, err);
                continue;
            }
        };
        if proof.audience() != issuer {
            continue;
        }
        if !proof.capabilities().iter().any(|granted| grants(granted, requested)) {
            continue;
        }
        if proof.verify_signature(resolver).is_err() {
            debug!("skipping proof with bad signature link={}", link);
            continue;
        }
        // The grantor must itself hold the capability.
        if check_authority(proof.issuer(), requested, proof.proofs(), blocks, resolver, depth + 1).is_ok() {
            return Ok(());
        }
    }

    Err(not_authorized(issuer, requested))
}

fn grants(granted: &Capability, requested: &Capability) -> bool {
    resource_covers(&granted.with, &requested.with) && ability_covers(&granted.can, &requested.can)
}

fn ability_covers(granted: &str, requested: &str) -> bool {
    if granted == "*" || granted == requested {
        return true;
    }
    match granted.strip_suffix("/*") {
        Some(prefix) => requested.starts_with(prefix) && requested[prefix.len()..].starts_with('/'),
        None => false,
    }
}

fn resource_covers(granted: &str, requested: &str) -> bool {
    granted == "*" || granted == "ucan:*" || granted == requested
}

fn not_authorized(issuer: &Did, requested: &Capability) -> UploadError {
    UploadError::NotAuthorized {
        issuer: issuer.to_string(),
        ability: requested.can.clone(),
        resource: requested.with.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ucan::signer::UcanSigner;
    use serde_cbor::Value;

    fn cap(can: &str, with: &str) -> Capability {
        Capability::new(can, with, Value::Null)
    }

    #[test]
    fn self_issued_invocation_passes() {
        let agent = UcanSigner::from_seed([31u8; 32]);
        let service = UcanSigner::from_seed([32u8; 32]);
        let inv = Invocation::build(&agent, service.did())
            .capability(cap("space/blob/add", &agent.did().to_string()))
            .issue()
            .expect("issue");
        validate_invocation(&inv, &DidResolver::new()).expect("valid");
    }

    #[test]
    fn delegated_invocation_passes() {
        let space = UcanSigner::from_seed([33u8; 32]);
        let agent = UcanSigner::from_seed([34u8; 32]);
        let service = UcanSigner::from_seed([35u8; 32]);

        let grant = Delegation::build(&space, agent.did())
            .capability(cap("space/blob/add", &space.did().to_string()))
            .issue()
            .expect("grant");

        let inv = Invocation::build(&agent, service.did())
            .capability(cap("space/blob/add", &space.did().to_string()))
            .proof(grant)
            .issue()
            .expect("issue");

        validate_invocation(&inv, &DidResolver::new()).expect("valid");
    }

    #[test]
    fn wildcard_ability_grant_covers_children() {
        let space = UcanSigner::from_seed([36u8; 32]);
        let agent = UcanSigner::from_seed([37u8; 32]);
        let service = UcanSigner::from_seed([38u8; 32]);

        let grant = Delegation::build(&space, agent.did())
            .capability(cap("space/*", &space.did().to_string()))
            .issue()
            .expect("grant");

        let inv = Invocation::build(&agent, service.did())
            .capability(cap("space/blob/add", &space.did().to_string()))
            .proof(grant)
            .issue()
            .expect("issue");

        validate_invocation(&inv, &DidResolver::new()).expect("valid");

        assert!(ability_covers("space/*", "space/index/add"));
        assert!(!ability_covers("space/*", "spaces/index/add"));
        assert!(!ability_covers("space/blob/*", "space/blob"));
    }

    #[test]
    fn missing_proof_is_rejected() {
        let space = UcanSigner::from_seed([39u8; 32]);
        let agent = UcanSigner::from_seed([40u8; 32]);
        let service = UcanSigner::from_seed([41u8; 32]);

        let inv = Invocation::build(&agent, service.did())
            .capability(cap("space/blob/add", &space.did().to_string()))
            .issue()
            .expect("issue");

        let err = validate_invocation(&inv, &DidResolver::new()).unwrap_err();
        assert!(matches!(err, UploadError::NotAuthorized { .. }));
    }

    #[test]
    fn proof_for_wrong_audience_is_rejected() {
        let space = UcanSigner::from_seed([42u8; 32]);
        let agent = UcanSigner::from_seed([43u8; 32]);
        let other = UcanSigner::from_seed([44u8; 32]);
        let service = UcanSigner::from_seed([45u8; 32]);

        let grant = Delegation::build(&space, other.did())
            .capability(cap("space/blob/add", &space.did().to_string()))
            .issue()
            .expect("grant");

        let inv = Invocation::build(&agent, service.did())
            .capability(cap("space/blob/add", &space.did().to_string()))
            .proof(grant)
            .issue()
            .expect("issue");

        assert!(validate_invocation(&inv, &DidResolver::new()).is_err());
    }

    #[test]
    fn two_level_chain_passes() {
        let space = UcanSigner::from_seed([46u8; 32]);
        let broker = UcanSigner::from_seed([47u8; 32]);
        let agent = UcanSigner::from_seed([48u8; 32]);
        let service = UcanSigner::from_seed([49u8; 32]);

        let root = Delegation::build(&space, broker.did())
            .capability(cap("space/blob/add", &space.did().to_string()))
            .issue()
            .expect("root");
        let child = Delegation::build(&broker, agent.did())
            .capability(cap("space/blob/add", &space.did().to_string()))
            .proof(root)
            .issue()
            .expect("child");

        let inv = Invocation::build(&agent, service.did())
            .capability(cap("space/blob/add", &space.did().to_string()))
            .proof(child)
            .issue()
            .expect("issue");

        validate_invocation(&inv, &DidResolver::new()).expect("valid");
    }
}
