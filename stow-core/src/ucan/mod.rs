pub mod block;
pub mod cid;
pub mod delegation;
pub mod did;
pub mod envelope;
pub mod invocation;
pub mod promise;
pub mod receipt;
pub mod signer;
pub mod validator;

pub use block::{Block, BlockMap};
pub use cid::Cid;
pub use delegation::{Capability, Delegation};
pub use did::Did;
pub use envelope::Envelope;
pub use invocation::Invocation;
pub use promise::{Await, Effects, Promise};
pub use receipt::{OutResult, Receipt};
pub use signer::{DidResolver, UcanSigner};
