//! Simulated transport.
//!
//! A [`Link`] stands in for the wire, a [`SimServer`] for the remote end and a
//! [`SimClient`] drives requests across them. Latencies are real sleeps, so
//! tests observe ordering under actual task scheduling.

mod client;
mod handle;
mod link;
mod server;

pub use client::SimClient;
pub use handle::ResponseHandle;
pub use link::{ExchangePermit, Link};
pub use server::SimServer;
