//! Device-level operations for the metering console.
//!
//! Command prefix discovery, identity queries, calibration readout,
//! fixed-point register decoding, load sampling, and relay control.

mod cli;
mod register;
mod sample;
mod tokens;

pub use cli::{LEVEL_MAX, LEVEL_MIN, MeterCli};
pub use register::{REGISTER_FULL_SCALE, RMS_DIVISOR, register_fraction, register_fraction_hex};
pub use sample::CurrentVoltageSample;
pub use tokens::{AcReference, CalibrationTokens};
