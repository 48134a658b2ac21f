//! Flattening high/low-order JSON into ordered rows
//!
//! [`Document`] resolves the input envelope into typed entries and
//! [`Flattener`] turns them into rows in emission order.

pub mod document;
pub mod flattener;

pub use document::{Document, EntryGroup, HIGH_ORDER_TAG_TYPE};
pub use flattener::Flattener;
