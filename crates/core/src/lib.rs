//! Heartwood Core - Shared types library.
//!
//! This crate provides common types used across all Heartwood components:
//! - `storefront` - Public-facing made-to-order cabinetry shop
//! - `admin` - Internal support portal (customer impersonation)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and emails
//! - [`cart`] - Cart domain model and consolidation result types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use types::*;
