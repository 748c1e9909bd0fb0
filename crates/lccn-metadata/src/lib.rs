//! Subscription storage for LCCN
//!
//! Supports a SQLite backend and an in-memory store with the same semantics.

pub mod memory;
pub mod repository;
pub mod traits;

pub use memory::MemorySubscriptionStore;
pub use repository::SqliteSubscriptionStore;
pub use traits::*;
