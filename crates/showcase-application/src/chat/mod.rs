//! Chat use cases: the live session and its persistence bridge.

mod bridge;
mod event;
mod session;

pub use bridge::PersistenceBridge;
pub use event::ChatEvent;
pub use session::ChatSession;
