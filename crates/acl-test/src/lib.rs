//! Test infrastructure for the TNSR ACL tools
//!
//! Provides:
//! - A simulated RESTCONF store implementing `Transport`, with a strict
//!   mode that refuses writes onto occupied sequence numbers
//! - Failure injection and a request log
//! - A fake HTTP server exposing the simulator on a loopback port
//! - Rule fixtures and verification helpers

pub mod fixtures;
mod server;
mod simulator;
mod verification;

pub use fixtures::*;
pub use server::FakeRestconfServer;
pub use simulator::{
    restconf_error, status_text, RecordedCall, SimulatedRestconf, SIMULATED_BASE_URL,
};
pub use verification::*;
