use crate::foundation::{Result, UploadError};
use crate::ucan::cid::Cid;
use std::collections::BTreeMap;

/// A content-addressed block: canonical bytes plus their link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub cid: Cid,
    pub bytes: Vec<u8>,
}

impl Block {
    pub fn new(bytes: Vec<u8>) -> Self {
        let cid = Cid::of(&bytes);
        Self { cid, bytes }
    }
}

/// An ordered set of blocks keyed by link. The carrier for proofs and
/// receipts that must travel alongside an invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockMap {
    inner: BTreeMap<Cid, Vec<u8>>,
}

impl BlockMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block: Block) {
        self.inner.insert(block.cid, block.bytes);
    }

    pub fn insert_bytes(&mut self, bytes: Vec<u8>) -> Cid {
        let block = Block::new(bytes);
        let cid = block.cid.clone();
        self.insert(block);
        cid
    }

    pub fn get(&self, cid: &Cid) -> Option<&[u8]> {
        self.inner.get(cid).map(Vec::as_slice)
    }

    pub fn require(&self, cid: &Cid) -> Result<&[u8]> {
        self.get(cid).ok_or_else(|| UploadError::block_missing(cid.to_string()))
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.inner.contains_key(cid)
    }

    pub fn merge(&mut self, other: &BlockMap) {
        for (cid, bytes) in &other.inner {
            self.inner.insert(cid.clone(), bytes.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Cid, &Vec<u8>)> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_require() {
        let mut map = BlockMap::new();
        let cid = map.insert_bytes(b"block".to_vec());
        assert_eq!(map.require(&cid).expect("present"), b"block");

        let absent = Cid::of(b"absent");
        assert!(map.require(&absent).is_err());
    }

    #[test]
    fn merge_unions_blocks() {
        let mut left = BlockMap::new();
        let a = left.insert_bytes(b"a".to_vec());
        let mut right = BlockMap::new();
        let b = right.insert_bytes(b"b".to_vec());

        left.merge(&right);
        assert!(left.contains(&a));
        assert!(left.contains(&b));
        assert_eq!(left.len(), 2);
    }
}
