pub mod connection;
pub mod indexer;
pub mod storage_node;

pub use connection::UcanConnection;
pub use indexer::IndexerClient;
pub use storage_node::{AcceptRequest, AllocateRequest, DelegationFetcher, StorageNodeClient};
