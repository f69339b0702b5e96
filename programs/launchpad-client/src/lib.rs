//! Client for a bonding-curve token launchpad program.
//!
//! Quotes trades on the constant-product curve, builds and submits the
//! program's transactions, collapses duplicate submissions and drives the
//! three-phase token creation flow.

pub mod client;
pub mod config;
pub mod constants;
pub mod curve;
pub mod dedup;
pub mod errors;
pub mod instructions;
pub mod math;
pub mod pda;
pub mod price_feed;
pub mod registry;
pub mod rpc;
pub mod state;
pub mod wallet;
pub mod workflow;

#[cfg(test)]
mod mock;

// Re-export for external use
pub use client::*;
pub use config::*;
pub use constants::*;
pub use dedup::DedupGate;
pub use errors::*;
pub use pda::*;
pub use price_feed::*;
pub use registry::*;
pub use rpc::*;
pub use state::*;
pub use wallet::*;
pub use workflow::*;
