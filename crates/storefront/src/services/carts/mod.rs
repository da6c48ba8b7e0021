//! Cart storage seam.
//!
//! All cart reads and writes go through the [`CartStore`] trait so the
//! consolidation executor and the route handlers are independent of where
//! cart rows actually live. Production uses the `PostgreSQL` implementation
//! in `crate::db::carts`; tests use [`memory::InMemoryCartStore`].

pub mod memory;
mod store;

pub use memory::InMemoryCartStore;
pub use store::{CartStore, CartStoreError, NewLineItem};
