pub mod session;

pub use session::{manage_session, CurrentSession};
