//! dripfeed — a rate-limited batch harvester.
//!
//! The library core ([`pipeline`]) drives a list of work items through a
//! slow, quota-limited external call: skip what is already done, dispatch
//! the rest under a shared rate limiter, isolate per-item failures, and
//! report aggregate counts. The [`harvest`] module supplies the concrete
//! catalog/download/filesystem collaborators behind the pipeline's traits.

pub mod cli;
pub mod config;
pub mod error;
pub mod harvest;
pub mod logging;
pub mod pipeline;
pub mod report;
