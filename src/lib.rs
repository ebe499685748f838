// Public API for the server binary and integration tests

pub mod api;
pub mod config;
pub mod coordinator;
pub mod deadline;
pub mod error;
pub mod protocol;
pub mod runtime;
pub mod state;
pub mod types;
pub mod ws;

pub use runtime::{spawn_session, SessionHandle};
