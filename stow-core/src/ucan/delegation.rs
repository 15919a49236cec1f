use crate::foundation::{Result, UploadError};
use crate::ucan::block::{Block, BlockMap};
use crate::ucan::cid::Cid;
use crate::ucan::did::Did;
use crate::ucan::signer::{DidResolver, UcanSigner};
use serde::{Deserialize, Serialize};
use serde_cbor::Value;
use std::collections::BTreeMap;

fn null_value() -> Value {
    Value::Null
}

fn is_null(value: &Value) -> bool {
    matches!(value, Value::Null)
}

/// One granted (or invoked) ability over a resource, with its caveats.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub can: String,
    pub with: String,
    #[serde(default = "null_value", skip_serializing_if = "is_null")]
    pub nb: Value,
}

impl Capability {
    pub fn new(can: impl Into<String>, with: impl Into<String>, nb: Value) -> Self {
        Self { can: can.into(), with: with.into(), nb }
    }
}

/// The signed portion of a delegation. Field order is the canonical
/// serialization order; `exp` is omitted entirely when absent so that
/// expiration-free delegations keep a stable content address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelegationPayload {
    pub iss: Did,
    pub aud: Did,
    pub att: Vec<Capability>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prf: Vec<Cid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fct: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize)]
struct DelegationWire {
    payload: DelegationPayload,
    sig: Vec<u8>,
}

/// A signed capability grant: issuer grants audience the right to exercise
/// the listed capabilities, justified by the proof chain in `prf`. Proof
/// blocks travel in `attached` so the delegation is self-contained.
#[derive(Clone, Debug)]
pub struct Delegation {
    payload: DelegationPayload,
    sig: Vec<u8>,
    bytes: Vec<u8>,
    cid: Cid,
    attached: BlockMap,
}

impl Delegation {
    pub fn build(issuer: &UcanSigner, audience: Did) -> DelegationBuilder {
        DelegationBuilder {
            issuer: issuer.clone(),
            audience,
            capabilities: Vec::new(),
            proofs: Vec::new(),
            facts: BTreeMap::new(),
            expiration: None,
        }
    }

    /// Decode a delegation from its own canonical block bytes.
    pub fn from_block(bytes: &[u8]) -> Result<Self> {
        let wire: DelegationWire = serde_cbor::from_slice(bytes)?;
        let cid = Cid::of(bytes);
        Ok(Self {
            payload: wire.payload,
            sig: wire.sig,
            bytes: bytes.to_vec(),
            cid,
            attached: BlockMap::new(),
        })
    }

    /// Resolve a delegation out of a block set, carrying the full set along
    /// so nested proofs remain reachable.
    pub fn read(link: &Cid, blocks: &BlockMap) -> Result<Self> {
        let bytes = blocks.require(link)?;
        let mut delegation = Self::from_block(bytes)?;
        delegation.attached = blocks.clone();
        Ok(delegation)
    }

    pub fn link(&self) -> &Cid {
        &self.cid
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn issuer(&self) -> &Did {
        &self.payload.iss
    }

    pub fn audience(&self) -> &Did {
        &self.payload.aud
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.payload.att
    }

    pub fn proofs(&self) -> &[Cid] {
        &self.payload.prf
    }

    pub fn expiration(&self) -> Option<u64> {
        self.payload.exp
    }

    pub fn facts(&self) -> &BTreeMap<String, Value> {
        &self.payload.fct
    }

    pub fn attached(&self) -> &BlockMap {
        &self.attached
    }

    /// Attach an extra block so it travels with this delegation (e.g. a
    /// receipt the recipient will need to resolve).
    pub fn attach(&mut self, block: Block) {
        self.attached.insert(block);
    }

    pub fn attach_blocks(&mut self, blocks: &BlockMap) {
        self.attached.merge(blocks);
    }

    /// All blocks needed to transport this delegation: its own block plus
    /// everything attached (proofs, nested blocks).
    pub fn export(&self) -> BlockMap {
        let mut blocks = self.attached.clone();
        blocks.insert(Block { cid: self.cid.clone(), bytes: self.bytes.clone() });
        blocks
    }

    pub fn verify_signature(&self, resolver: &DidResolver) -> Result<()> {
        let payload_bytes = serde_cbor::to_vec(&self.payload)?;
        resolver.verify(&self.payload.iss, &payload_bytes, &self.sig)
    }
}

pub struct DelegationBuilder {
    issuer: UcanSigner,
    audience: Did,
    capabilities: Vec<Capability>,
    proofs: Vec<Delegation>,
    facts: BTreeMap<String, Value>,
    expiration: Option<u64>,
}

impl DelegationBuilder {
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn proof(mut self, proof: Delegation) -> Self {
        self.proofs.push(proof);
        self
    }

    pub fn fact(mut self, key: impl Into<String>, value: Value) -> Self {
        self.facts.insert(key.into(), value);
        self
    }

    /// Stamp an expiration. Anything whose link is referenced forward must
    /// NOT call this: the timestamp would make the link non-deterministic.
    pub fn expiration(mut self, unix_secs: u64) -> Self {
        self.expiration = Some(unix_secs);
        self
    }

    pub fn issue(self) -> Result<Delegation> {
        let mut attached = BlockMap::new();
        let mut prf = Vec::with_capacity(self.proofs.len());
        for proof in &self.proofs {
            prf.push(proof.link().clone());
            attached.merge(&proof.export());
        }

        let payload = DelegationPayload {
            iss: self.issuer.did(),
            aud: self.audience,
            att: self.capabilities,
            prf,
            exp: self.expiration,
            fct: self.facts,
        };
        let payload_bytes = serde_cbor::to_vec(&payload)?;
        let sig = self.issuer.sign(&payload_bytes);

        let wire = DelegationWire { payload, sig };
        let bytes = serde_cbor::to_vec(&wire)?;
        let cid = Cid::of(&bytes);
        let DelegationWire { payload, sig } = serde_cbor::from_slice(&bytes)?;
        if serde_cbor::to_vec(&payload)? != payload_bytes {
            return Err(UploadError::SerializationError {
                format: "cbor".to_string(),
                details: "delegation payload did not round-trip canonically".to_string(),
            });
        }
        Ok(Delegation { payload, sig, bytes, cid, attached })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UcanSigner {
        UcanSigner::from_seed([9u8; 32])
    }

    fn audience() -> Did {
        Did::from_public_key([8u8; 32])
    }

    #[test]
    fn issue_and_verify() {
        let signer = signer();
        let delegation = Delegation::build(&signer, audience())
            .capability(Capability::new("blob/allocate", audience().to_string(), Value::Null))
            .issue()
            .expect("issue");

        let resolver = DidResolver::new();
        delegation.verify_signature(&resolver).expect("signature valid");
        assert_eq!(delegation.issuer(), &signer.did());
    }

    #[test]
    fn block_round_trip_preserves_link() {
        let delegation = Delegation::build(&signer(), audience())
            .capability(Capability::new("blob/accept", audience().to_string(), Value::Null))
            .issue()
            .expect("issue");

        let decoded = Delegation::from_block(delegation.bytes()).expect("decode");
        assert_eq!(decoded.link(), delegation.link());
        decoded.verify_signature(&DidResolver::new()).expect("signature survives round trip");
    }

    #[test]
    fn expiration_free_links_are_deterministic() {
        let build = || {
            Delegation::build(&signer(), audience())
                .capability(Capability::new("blob/accept", audience().to_string(), Value::Null))
                .issue()
                .expect("issue")
        };
        assert_eq!(build().link(), build().link());
        assert_eq!(build().bytes(), build().bytes());
    }

    #[test]
    fn expiration_changes_the_link() {
        let base = Delegation::build(&signer(), audience())
            .capability(Capability::new("blob/accept", audience().to_string(), Value::Null))
            .issue()
            .expect("issue");
        let expiring = Delegation::build(&signer(), audience())
            .capability(Capability::new("blob/accept", audience().to_string(), Value::Null))
            .expiration(1_700_000_000)
            .issue()
            .expect("issue");
        assert_ne!(base.link(), expiring.link());
    }

    #[test]
    fn proofs_travel_in_export() {
        let root = Delegation::build(&signer(), audience())
            .capability(Capability::new("space/content/retrieve", "did:web:space.example", Value::Null))
            .issue()
            .expect("issue root");
        let child = Delegation::build(&signer(), audience())
            .capability(Capability::new("space/content/retrieve", "did:web:space.example", Value::Null))
            .proof(root.clone())
            .issue()
            .expect("issue child");

        assert_eq!(child.proofs(), &[root.link().clone()]);
        let exported = child.export();
        assert!(exported.contains(root.link()));
        assert!(exported.contains(child.link()));
    }

    #[test]
    fn tampered_signature_fails() {
        let delegation = Delegation::build(&signer(), audience())
            .capability(Capability::new("blob/allocate", audience().to_string(), Value::Null))
            .issue()
            .expect("issue");

        let mut bytes = delegation.bytes().to_vec();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let tampered = Delegation::from_block(&bytes).expect("decode");
        assert!(tampered.verify_signature(&DidResolver::new()).is_err());
    }
}
