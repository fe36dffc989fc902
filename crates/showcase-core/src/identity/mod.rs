//! Identity domain module.
//!
//! The identity scopes every durable chat operation. Absence of an identity
//! is the signed-out state, not an error.

mod model;
mod provider;

pub use model::Identity;
pub use provider::IdentityProvider;
