pub mod label;
pub mod model;
pub mod wire;

pub use label::{bill_label, format_timestamp, parse_api_timestamp};
pub use model::{
    BillDetail, BillRecord, BillStatus, BillSummary, ReferenceItem, ReferenceKind, TrackingEntry,
    TrackingRow, User,
};
pub use wire::{Envelope, ItemError, Link, parse_item};
