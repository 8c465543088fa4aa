// Application layer - use cases and orchestration.
// Both the HTTP API and the CLI go through `LedgerService`.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
