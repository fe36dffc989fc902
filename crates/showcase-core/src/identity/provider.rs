use super::model::Identity;
use crate::error::Result;

/// Source of the current identity.
///
/// Consulted before every chat operation. Implementations decide where the
/// identity comes from (configuration, a token exchange, a test fixture).
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the signed-in identity, or `None` when signed out.
    fn current_identity(&self) -> Option<Identity>;

    /// Forgets the current identity.
    ///
    /// After this returns, `current_identity` yields `None` until a new
    /// identity is established.
    async fn sign_out(&self) -> Result<()>;
}
