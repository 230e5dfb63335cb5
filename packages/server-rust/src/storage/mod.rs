//! Route configuration and variable persistence.
//!
//! [`MemoryStore`] keeps everything in process; [`RedbStore`] (feature
//! `redb`, on by default) persists JSON documents in an embedded database.

pub mod memory;
#[cfg(feature = "redb")]
pub mod redb_store;

pub use memory::MemoryStore;
#[cfg(feature = "redb")]
pub use redb_store::RedbStore;
