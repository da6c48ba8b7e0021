//! Heartwood admin portal library.
//!
//! Shared between the `heartwood-admin` binary and the integration-tests
//! crate, which exercises the impersonation registry and save-status
//! tracker directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod impersonation;
pub mod routes;
pub mod state;
