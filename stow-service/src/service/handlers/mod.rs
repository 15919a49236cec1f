mod access_delegate;
mod space_blob_add;
mod space_blob_replicate;
mod space_index_add;
mod ucan_conclude;

pub use access_delegate::access_delegate;
pub use space_blob_add::space_blob_add;
pub use space_blob_replicate::space_blob_replicate;
pub use space_index_add::space_index_add;
pub use ucan_conclude::ucan_conclude;
