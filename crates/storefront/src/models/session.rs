//! Session-related types.
//!
//! Everything stored in the session goes through the enumerated keys below
//! and the typed accessors that wrap them; nothing reads the session by an
//! ad-hoc string.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use heartwood_core::{CustomerId, Email};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Customer's database ID.
    pub id: CustomerId,
    /// Customer's email address.
    pub email: Email,
}

/// Session keys. The complete set; add here, never inline.
pub mod keys {
    /// Key for storing the current logged-in customer.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the anonymous cart scope token.
    pub const CART_TOKEN: &str = "cart_token";
}

/// The logged-in customer, if any.
pub async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// The anonymous cart token, if one has been issued to this session.
pub async fn cart_token(session: &Session) -> Option<Uuid> {
    session.get::<Uuid>(keys::CART_TOKEN).await.ok().flatten()
}

/// The anonymous cart token, issuing one if the session has none yet.
///
/// # Errors
///
/// Returns the session store's error if the new token cannot be persisted.
pub async fn ensure_cart_token(session: &Session) -> Result<Uuid, tower_sessions::session::Error> {
    if let Some(token) = session.get::<Uuid>(keys::CART_TOKEN).await? {
        return Ok(token);
    }
    let token = Uuid::new_v4();
    session.insert(keys::CART_TOKEN, token).await?;
    Ok(token)
}

/// Drop the anonymous cart token (after its session has been claimed).
///
/// # Errors
///
/// Returns the session store's error if the removal cannot be persisted.
pub async fn clear_cart_token(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<Uuid>(keys::CART_TOKEN).await?;
    Ok(())
}
