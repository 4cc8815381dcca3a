//! Core types, rules and the operation engine for commercial proposals.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Backends implement the [`ports`]; interface layers talk to a
//! [`ProposalService`](service::ProposalService).

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod attachment;
pub mod cycle;
pub mod document;
pub mod engine;
pub mod error;
pub mod event;
pub mod guard;
pub mod history;
pub mod money;
pub mod ports;
pub mod proposal;
pub mod service;
pub mod status;
pub mod supplier;

pub use engine::Engine;
pub use error::{Entity, Error, ErrorKind, Result, Violation};
