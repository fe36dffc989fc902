//! Application layer for Showcase.
//!
//! Coordinates the domain types in `showcase-core` with the storage and HTTP
//! adapters: a [`ChatSession`] per signed-in identity, the
//! [`PersistenceBridge`] it writes through, and [`AppContext`] which wires
//! everything from configuration.

pub mod app_context;
pub mod chat;

pub use app_context::AppContext;
pub use chat::{ChatEvent, ChatSession, PersistenceBridge};
