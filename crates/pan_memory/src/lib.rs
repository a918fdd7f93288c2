//! # Pan Memory
//!
//! Everything the assistant remembers:
//!
//! - [`SqliteMemory`]: the persistent store (users, affinity, memories,
//!   opinions, news archive)
//! - [`StoreHandle`]: shared store access that degrades to in-process state
//!   on the first failure
//! - [`MemoryManager`]: short-term buffer plus the long-term gateway
//! - [`UserResolver`]: speaker identity and affinity

pub mod manager;
pub mod short_term;
pub mod sqlite;
pub mod store;
pub mod users;

pub use manager::{MemoryManager, Recall};
pub use short_term::ShortTermBuffer;
pub use sqlite::SqliteMemory;
pub use store::StoreHandle;
pub use users::{extract_name, AffinityUpdate, ResolvedUser, UserResolver};

#[cfg(test)]
mod tests;
