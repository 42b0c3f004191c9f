//! # Embercli
//!
//! Async telnet CLI scraper library for Ember-based power metering devices.
//!
//! Embercli provides a high-level async API for talking to the telnet
//! console of Ember-radio power metering hardware: quiescence-paced
//! reads with transparent telnet negotiation, prompt-synchronized
//! command exchanges with bounded retries, and typed decoding of the
//! meter's fixed-point registers and calibration reports.
//!
//! ## Features
//!
//! - Async telnet transport over tokio TCP
//! - Transparent option negotiation (suppress go-ahead granted, everything else refused)
//! - Prompt synchronization and retried command exchanges
//! - Fixed-point register decoding and load sampling
//! - Calibration token readout with serde support
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use embercli::meter::MeterCli;
//! use embercli::transport::TelnetConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), embercli::Error> {
//!     let config = TelnetConfig::new("192.168.1.50", 4900);
//!     let mut meter = MeterCli::connect(config).await?;
//!
//!     let prefix = meter.command_prefix().await?;
//!     let tokens = meter.calibration_info(&prefix).await?;
//!     println!("calibration: {tokens:?}");
//!
//!     let sample = meter.load_sample(&prefix, &tokens.ac_reference()).await?;
//!     println!("load: {sample}");
//!
//!     meter.close();
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod error;
pub mod meter;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export main types for convenience
pub use command::{CommandSession, MatchResult, PromptOptions, Retries};
pub use error::Error;
pub use meter::{AcReference, CalibrationTokens, CurrentVoltageSample, MeterCli};
pub use transport::{Credentials, TelnetConfig, TelnetTransport};
