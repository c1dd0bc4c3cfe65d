pub mod config;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod utils;


pub use crate::config::Settings;
pub use routes::build_router;
pub use state::AppState;
