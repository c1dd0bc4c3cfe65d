//! Upload, cut, archive lookup and delete, scoped to one session.

mod manager;

pub use manager::FileManager;
