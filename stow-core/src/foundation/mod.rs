pub mod error;
pub mod util;

pub use error::{Result, UploadError};
