use crate::foundation::{Result, UploadError};
use crate::ucan::block::{Block, BlockMap};
use crate::ucan::cid::Cid;
use crate::ucan::invocation::Invocation;
use crate::ucan::receipt::Receipt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Default)]
struct EnvelopeWire {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    invocations: Vec<Cid>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    receipts: BTreeMap<Cid, Cid>,
    #[serde(default)]
    blocks: BTreeMap<Cid, Vec<u8>>,
}

/// A self-contained UCAN message: root links plus every block needed to
/// resolve them. Requests carry invocation roots; responses map each
/// invocation link to its receipt link. Decoding verifies that every block
/// hashes to its key, so a tampered envelope fails before any dispatch.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    pub invocations: Vec<Cid>,
    pub receipts: BTreeMap<Cid, Cid>,
    blocks: BlockMap,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a request envelope executing the given invocations.
    pub fn execution_request(invocations: &[Invocation]) -> Self {
        let mut envelope = Self::new();
        for invocation in invocations {
            envelope.add_invocation(invocation);
        }
        envelope
    }

    pub fn add_invocation(&mut self, invocation: &Invocation) {
        self.invocations.push(invocation.link().clone());
        self.blocks.merge(&invocation.export());
    }

    pub fn add_receipt(&mut self, invocation: Cid, receipt: &Receipt) {
        self.receipts.insert(invocation, receipt.link().clone());
        self.blocks.merge(&receipt.export());
    }

    pub fn attach(&mut self, blocks: &BlockMap) {
        self.blocks.merge(blocks);
    }

    pub fn attach_block(&mut self, block: Block) {
        self.blocks.insert(block);
    }

    pub fn blocks(&self) -> &BlockMap {
        &self.blocks
    }

    pub fn receipt_link_for(&self, invocation: &Cid) -> Option<&Cid> {
        self.receipts.get(invocation)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut blocks = BTreeMap::new();
        for (cid, bytes) in self.blocks.iter() {
            blocks.insert(cid.clone(), bytes.clone());
        }
        let wire = EnvelopeWire {
            invocations: self.invocations.clone(),
            receipts: self.receipts.clone(),
            blocks,
        };
        Ok(serde_cbor::to_vec(&wire)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let wire: EnvelopeWire =
            serde_cbor::from_slice(bytes).map_err(|err| UploadError::EnvelopeDecode(err.to_string()))?;
        let mut blocks = BlockMap::new();
        for (cid, block_bytes) in wire.blocks {
            cid.verify(&block_bytes)
                .map_err(|err| UploadError::EnvelopeDecode(err.to_string()))?;
            blocks.insert(Block { cid, bytes: block_bytes });
        }
        Ok(Self { invocations: wire.invocations, receipts: wire.receipts, blocks })
    }
}
