mod account;
mod id;
mod transaction;

pub use account::AccountIdentity;
pub use id::Id;
pub use transaction::{PageTransaction, Transaction};
