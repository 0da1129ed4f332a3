//! Core types and trait definitions for the Leasebook contract status history.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod contract;
pub mod error;
pub mod interval;
pub mod memory;
pub mod service;
pub mod status;
pub mod store;
pub mod transition;
pub mod view;

pub use error::{Classify, Error, ErrorKind, Result};
pub use service::StatusService;
