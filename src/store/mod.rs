//! Fjall-based record storage
//!
//! Every entity of the schema registry gets its own partition holding JSON
//! records keyed by primary key. A `metadata` partition keeps the integer id
//! sequences. Multi-record writes (user plus detail, cascading deletes) are
//! committed as single fjall batches so they either land together or not at
//! all.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use weepstay::models::schema::Entity;
//! use weepstay::store::RecordStore;
//!
//! let store = RecordStore::open("data/weepstay")?;
//! let country = store.insert(Entity::Country, record)?;
//! let summary = store.delete(Entity::Country, &country["id"])?;
//! ```

pub mod error;
pub mod partitions;
pub mod record_set;
#[allow(clippy::module_inception)]
pub mod store;

pub use error::{Result, StoreError};
pub use record_set::{order_by, value_matches, RecordSet};
pub use store::{AtomicWrite, DeleteSummary, Record, RecordStore, StoreStats};
