//! Storefront services.
//!
//! - [`carts`] - cart storage seam (`CartStore`) and implementations
//! - [`consolidation`] - cart consolidation executor and trigger
//! - [`notify`] - fire-and-forget user notification sink

pub mod carts;
pub mod consolidation;
pub mod notify;
