//! Reverse-tunnel client to the metrics broker.
//!
//! The agent dials the broker over TLS, introduces itself with a
//! `REVERSE <path>` line, and then serves broker-initiated metric fetches
//! multiplexed over 15-bit channels on that single long-lived connection:
//! each `CONNECT` command carries an HTTP request the client forwards
//! verbatim to the local metric endpoint, and the response travels back in
//! bounded frames on the originating channel. A supervisor owns the
//! connection lifecycle: typed backoff on failure, periodic
//! reconfiguration, and a bounded retry budget.

pub mod config;
mod error;
mod fetcher;
mod frame;
mod link;
mod session;
mod supervisor;


pub use config::{ReverseConfig, ReverseUrl};
pub use error::{FetchError, ReverseError};
pub use supervisor::run;
