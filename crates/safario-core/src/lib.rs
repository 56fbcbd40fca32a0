//! Core types and trait definitions for Safario.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the geofencing evaluator, the role/approval workflow, the incident records
//! and their status transitions, and the [`store::SafetyStore`] abstraction
//! that storage backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod change;
pub mod contact;
pub mod error;
pub mod geo;
pub mod geofence;
pub mod profile;
pub mod report;
pub mod role;
pub mod store;

pub use error::{Error, Result};
