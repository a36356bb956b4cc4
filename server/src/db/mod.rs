//! Database module for PostgreSQL persistence.

mod changes;
mod pool;
mod records;

pub use changes::*;
pub use pool::*;
pub use records::*;
