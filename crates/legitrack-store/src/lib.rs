//! Storage layer: DuckDB relational tables for synchronized bills and user accounts.

mod accounts;
mod bills;
mod duck;
mod error;
mod reference;
pub mod schema;

pub use bills::{BillFilter, BillPage, BillSync, BillWriteOutcome};
pub use duck::{DuckStore, SharedStore, lock, shared};
pub use error::StoreError;
pub use reference::ReferenceChanges;
