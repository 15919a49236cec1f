use crate::foundation::{Result, UploadError};
use crate::ucan::block::BlockMap;
use crate::ucan::cid::Cid;
use crate::ucan::delegation::{Capability, Delegation, DelegationBuilder};
use crate::ucan::did::Did;
use crate::ucan::signer::UcanSigner;
use serde_cbor::Value;
use std::collections::BTreeMap;

/// A delegation whose ability is to be executed now. Its content address
/// doubles as the task identifier, which is why callers that reference an
/// invocation forward must build it without an expiration.
#[derive(Clone, Debug)]
pub struct Invocation {
    delegation: Delegation,
}

impl Invocation {
    pub fn build(issuer: &UcanSigner, audience: Did) -> InvocationBuilder {
        InvocationBuilder { inner: Delegation::build(issuer, audience) }
    }

    pub fn from_delegation(delegation: Delegation) -> Self {
        Self { delegation }
    }

    pub fn read(link: &Cid, blocks: &BlockMap) -> Result<Self> {
        Ok(Self { delegation: Delegation::read(link, blocks)? })
    }

    pub fn link(&self) -> &Cid {
        self.delegation.link()
    }

    pub fn bytes(&self) -> &[u8] {
        self.delegation.bytes()
    }

    pub fn issuer(&self) -> &Did {
        self.delegation.issuer()
    }

    pub fn audience(&self) -> &Did {
        self.delegation.audience()
    }

    pub fn capabilities(&self) -> &[Capability] {
        self.delegation.capabilities()
    }

    /// The single capability an invocation executes. Multi-capability
    /// invocations dispatch on the first entry.
    pub fn capability(&self) -> Result<&Capability> {
        self.delegation
            .capabilities()
            .first()
            .ok_or_else(|| UploadError::EnvelopeDecode("invocation has no capabilities".to_string()))
    }

    pub fn facts(&self) -> &BTreeMap<String, Value> {
        self.delegation.facts()
    }

    pub fn attached(&self) -> &BlockMap {
        self.delegation.attached()
    }

    pub fn attach_blocks(&mut self, blocks: &BlockMap) {
        self.delegation.attach_blocks(blocks);
    }

    pub fn export(&self) -> BlockMap {
        self.delegation.export()
    }

    pub fn as_delegation(&self) -> &Delegation {
        &self.delegation
    }
}

pub struct InvocationBuilder {
    inner: DelegationBuilder,
}

impl InvocationBuilder {
    pub fn capability(mut self, capability: Capability) -> Self {
        self.inner = self.inner.capability(capability);
        self
    }

    pub fn proof(mut self, proof: Delegation) -> Self {
        self.inner = self.inner.proof(proof);
        self
    }

    pub fn fact(mut self, key: impl Into<String>, value: Value) -> Self {
        self.inner = self.inner.fact(key, value);
        self
    }

    pub fn expiration(mut self, unix_secs: u64) -> Self {
        self.inner = self.inner.expiration(unix_secs);
        self
    }

    pub fn issue(self) -> Result<Invocation> {
        Ok(Invocation { delegation: self.inner.issue()? })
    }
}
