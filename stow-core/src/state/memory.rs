use super::{Allocation, ProviderInfo, StateStore, StoredReceipt};
use crate::foundation::{Result, UploadError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

struct MemoryInner {
    allocations: HashMap<String, Allocation>,
    receipts: HashMap<String, StoredReceipt>,
    // registration order decides which provider is "first"
    providers: Vec<ProviderInfo>,
}

impl MemoryInner {
    fn new() -> Self {
        Self { allocations: HashMap::new(), receipts: HashMap::new(), providers: Vec::new() }
    }
}

/// In-memory `StateStore`. Per-key atomicity comes from the single inner
/// mutex; suitable for a mock deployment and for tests.
pub struct MemoryStateStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(MemoryInner::new())) }
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| UploadError::storage("memory", "state store lock poisoned"))
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for MemoryStateStore {
    fn put_allocation(&self, digest_hex: &str, allocation: Allocation) -> Result<()> {
        self.lock_inner()?.allocations.insert(digest_hex.to_string(), allocation);
        Ok(())
    }

    fn get_allocation(&self, digest_hex: &str) -> Result<Option<Allocation>> {
        Ok(self.lock_inner()?.allocations.get(digest_hex).cloned())
    }

    fn delete_allocation(&self, digest_hex: &str) -> Result<()> {
        self.lock_inner()?.allocations.remove(digest_hex);
        Ok(())
    }

    fn put_receipt(&self, task_cid: &str, receipt: StoredReceipt) -> Result<()> {
        self.lock_inner()?.receipts.insert(task_cid.to_string(), receipt);
        Ok(())
    }

    fn get_receipt(&self, task_cid: &str) -> Result<Option<StoredReceipt>> {
        Ok(self.lock_inner()?.receipts.get(task_cid).cloned())
    }

    fn put_provider(&self, did: &str, provider: ProviderInfo) -> Result<()> {
        let mut inner = self.lock_inner()?;
        match inner.providers.iter_mut().find(|existing| existing.did == did) {
            Some(existing) => *existing = provider,
            None => inner.providers.push(provider),
        }
        Ok(())
    }

    fn get_first_provider(&self) -> Result<Option<ProviderInfo>> {
        Ok(self.lock_inner()?.providers.first().cloned())
    }

    fn get_provider_delegation(&self, provider_did: &str) -> Result<Option<crate::ucan::Delegation>> {
        Ok(self
            .lock_inner()?
            .providers
            .iter()
            .find(|provider| provider.did == provider_did)
            .and_then(|provider| provider.delegation.clone()))
    }
}
