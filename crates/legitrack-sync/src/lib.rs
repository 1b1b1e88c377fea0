//! Sync layer: the Chamber open-data client and the worker that mirrors
//! reference tables, bills, tracking history and theme links into the store.

pub mod api;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod worker;

pub use api::CamaraApi;
pub use error::SyncError;
#[cfg(feature = "http")]
pub use http::{CamaraClient, DEFAULT_BASE_URL};
pub use worker::{BillStats, CycleReport, ReferenceStats, SyncSettings, SyncWorker, wait_for_store};
