//! Browser UI for Docu Assistant.
//!
//! Serves a single chat page: upload PDFs, press Train, then ask questions
//! about them. Each browser gets its own session, identified by a cookie.

pub mod error;
pub mod handlers;
pub mod render;
pub mod routes;
pub mod session;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use session::{Session, SessionStore};
pub use state::AppState;
