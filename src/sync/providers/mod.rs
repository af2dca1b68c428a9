//! Bank provider implementations.

mod monzo;
mod starling;

pub use monzo::MonzoProvider;
pub use starling::StarlingProvider;
