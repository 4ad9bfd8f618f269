// Application layer - the transaction service and its error kinds.
// The CLI (or any other boundary) talks to the ledger exclusively
// through this module.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
