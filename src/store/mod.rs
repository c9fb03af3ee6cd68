//! Storage layer: per-kind store contracts and backends.

pub mod memory;
pub mod traits;

pub use memory::{InMemoryAlertStore, InMemoryRequestStore, InMemoryStores, InMemoryZoneStore};
pub use traits::{Admission, AlertStore, RequestStore, ZoneStore};
