//! Newtype wrappers shared across Heartwood crates.

mod email;
mod id;

pub use email::{Email, EmailError};
pub use id::{AdminUserId, CartSessionId, CustomerId, LineItemId, ProductTypeId};
