//! Telnet transport layer.
//!
//! This module provides the low-level connection management: TCP
//! setup, quiescence-paced reads, telnet option negotiation, and the
//! optional login exchange.

pub mod config;
mod negotiation;
mod telnet;

pub use config::{Credentials, TelnetConfig};
pub use telnet::TelnetTransport;
