pub mod capability;
pub mod foundation;
pub mod state;
pub mod ucan;

pub use foundation::{Result, UploadError};
