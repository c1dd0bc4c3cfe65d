pub mod codec;
pub mod config;
pub mod error;
pub mod files;
pub mod session;

pub use config::RegistryConfig;
pub use error::{CodecError, CoreError, CoreResult};
pub use files::FileManager;
pub use session::{FileRecord, Session, SessionRegistry};
