pub mod chat;
pub mod config;
pub mod error;
pub mod identity;

// Re-export common error type
pub use error::ShowcaseError;
