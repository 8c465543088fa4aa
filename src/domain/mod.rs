mod allocator;
mod customer;
mod group;
mod ledger;
mod money;
mod transaction;

pub use allocator::*;
pub use customer::*;
pub use group::*;
pub use ledger::*;
pub use money::*;
pub use transaction::*;
