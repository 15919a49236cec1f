use crate::foundation::Result;
use crate::ucan::block::{Block, BlockMap};
use crate::ucan::cid::Cid;
use crate::ucan::did::Did;
use crate::ucan::promise::Effects;
use crate::ucan::signer::{DidResolver, UcanSigner};
use serde::{Deserialize, Serialize};
use serde_cbor::Value;
use std::collections::BTreeMap;

/// Success-or-failure outcome of an invocation. Exactly one side is set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl OutResult {
    pub fn ok(value: Value) -> Self {
        Self { ok: Some(value), error: None }
    }

    pub fn ok_empty() -> Self {
        Self::ok(Value::Map(BTreeMap::new()))
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(Value::Text("message".to_string()), Value::Text(message.into()));
        Self { ok: None, error: Some(Value::Map(map)) }
    }

    pub fn failure_named(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(Value::Text("message".to_string()), Value::Text(message.into()));
        map.insert(Value::Text("name".to_string()), Value::Text(name.into()));
        Self { ok: None, error: Some(Value::Map(map)) }
    }

    pub fn is_ok(&self) -> bool {
        self.ok.is_some()
    }

    /// Diagnostic text for a failure node: the `message` field, falling back
    /// to `name`, falling back to a fixed string. Never raw stack data.
    pub fn failure_message(&self) -> String {
        let error = match &self.error {
            Some(error) => error,
            None => return "unknown error".to_string(),
        };
        for key in ["message", "name"] {
            if let Value::Map(map) = error {
                if let Some(Value::Text(text)) = map.get(&Value::Text(key.to_string())) {
                    return text.clone();
                }
            }
        }
        "unknown error".to_string()
    }
}

/// The signed portion of a receipt: the invocation it ran, the outcome, and
/// any fork effects. Deterministic for deterministic inputs, which is what
/// makes receipt re-issuance idempotent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceiptPayload {
    pub ran: Cid,
    pub out: OutResult,
    #[serde(default, skip_serializing_if = "Effects::is_empty")]
    pub fx: Effects,
    pub iss: Did,
}

#[derive(Serialize, Deserialize)]
struct ReceiptWire {
    payload: ReceiptPayload,
    sig: Vec<u8>,
}

/// A signed record binding an invocation link to its outcome. May be
/// re-issued by a different signer against a different `ran` to expose the
/// same outcome under a different task identity.
#[derive(Clone, Debug)]
pub struct Receipt {
    payload: ReceiptPayload,
    sig: Vec<u8>,
    bytes: Vec<u8>,
    cid: Cid,
    attached: BlockMap,
}

impl Receipt {
    pub fn issue(signer: &UcanSigner, ran: Cid, out: OutResult, fx: Effects, attached: BlockMap) -> Result<Self> {
        let payload = ReceiptPayload { ran, out, fx, iss: signer.did() };
        let payload_bytes = serde_cbor::to_vec(&payload)?;
        let sig = signer.sign(&payload_bytes);
        let wire = ReceiptWire { payload, sig };
        let bytes = serde_cbor::to_vec(&wire)?;
        let cid = Cid::of(&bytes);
        let ReceiptWire { payload, sig } = serde_cbor::from_slice(&bytes)?;
        Ok(Self { payload, sig, bytes, cid, attached })
    }

    pub fn from_block(bytes: &[u8]) -> Result<Self> {
        let wire: ReceiptWire = serde_cbor::from_slice(bytes)?;
        let cid = Cid::of(bytes);
        Ok(Self { payload: wire.payload, sig: wire.sig, bytes: bytes.to_vec(), cid, attached: BlockMap::new() })
    }

    /// Resolve a receipt out of a block set, keeping the set attached so
    /// blocks it references (location claims, ran invocations) stay reachable.
    pub fn read(link: &Cid, blocks: &BlockMap) -> Result<Self> {
        let bytes = blocks.require(link)?;
        let mut receipt = Self::from_block(bytes)?;
        receipt.attached = blocks.clone();
        Ok(receipt)
    }

    pub fn link(&self) -> &Cid {
        &self.cid
    }

    pub fn ran(&self) -> &Cid {
        &self.payload.ran
    }

    pub fn out(&self) -> &OutResult {
        &self.payload.out
    }

    pub fn fx(&self) -> &Effects {
        &self.payload.fx
    }

    pub fn issuer(&self) -> &Did {
        &self.payload.iss
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn attached(&self) -> &BlockMap {
        &self.attached
    }

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
