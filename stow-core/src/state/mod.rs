mod memory;

pub use memory::MemoryStateStore;

use crate::foundation::Result;
use crate::ucan::{BlockMap, Cid, Delegation, Receipt};

/// Pending-allocation bookkeeping, keyed by blob digest hex. At most one
/// live allocation exists per digest; `accept_inv_link` is set before the
/// `space/blob/add` response is returned.
#[derive(Clone, Debug)]
pub struct Allocation {
    /// Space DID the allocation belongs to.
    pub space: String,
    pub digest: Vec<u8>,
    pub size: u64,
    /// Link of the `space/blob/add` invocation that created the allocation.
    pub cause: Cid,
    /// DID of the chosen storage node.
    pub provider: String,
    pub upload_url: Option<String>,
    /// Deterministic link of the not-yet-executed `blob/accept` invocation.
    pub accept_inv_link: Option<Cid>,
    /// Unix seconds; soft expiry for garbage collection.
    pub expires_at: u64,
}

/// A re-issued receipt stored for retrieval, with every block the receipt
/// references. Immutable once stored: overwrites carry identical bytes.
#[derive(Clone, Debug)]
pub struct StoredReceipt {
    pub task: Cid,
    pub receipt: Receipt,
    pub blocks: BlockMap,
    pub added_at: u64,
}

/// A registered storage node: identity, endpoint, and the service→node
/// delegation used as proof on outbound invocations.
#[derive(Clone, Debug)]
pub struct ProviderInfo {
    pub did: String,
    pub endpoint: String,
    pub delegation: Option<Delegation>,
}

/// Durable key-value state consumed by the choreography. Operations are
/// keyed and independent; implementations provide per-key atomicity and
/// read-your-write semantics per key. Last put wins.
pub trait StateStore: Send + Sync {
    fn put_allocation(&self, digest_hex: &str, allocation: Allocation) -> Result<()>;
    fn get_allocation(&self, digest_hex: &str) -> Result<Option<Allocation>>;
    fn delete_allocation(&self, digest_hex: &str) -> Result<()>;

    fn put_receipt(&self, task_cid: &str, receipt: StoredReceipt) -> Result<()>;
    fn get_receipt(&self, task_cid: &str) -> Result<Option<StoredReceipt>>;

    fn put_provider(&self, did: &str, provider: ProviderInfo) -> Result<()>;
    fn get_first_provider(&self) -> Result<Option<ProviderInfo>>;
    fn get_provider_delegation(&self, provider_did: &str) -> Result<Option<Delegation>>;
}
