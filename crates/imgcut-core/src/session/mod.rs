//! Session registry and per-session state.
//!
//! Two lock levels:
//! - the registry `RwLock` guards only the id -> session map
//! - each session's own mutex guards its file index and its directory
//!
//! The two are never held at the same time.

mod expiry;
mod registry;
mod types;

pub use registry::SessionRegistry;
pub use types::{FileRecord, Session};
