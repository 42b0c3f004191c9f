//! Calibration data scraped from the device console.

use std::sync::LazyLock;

use log::trace;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};

static VOLTAGE_FACTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Voltage Factor: ([0-9]+)").expect("Invalid regex pattern"));
static CURRENT_FACTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Current Factor: ([0-9]+)").expect("Invalid regex pattern"));
static VOLTAGE_GAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"VGain Token 0x([0-9A-F]{8})").expect("Invalid regex pattern"));
static CURRENT_GAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"IGain Token 0x([0-9A-F]{8})").expect("Invalid regex pattern"));

/// AC reference levels the load is driven with while sampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcReference {
    /// Reference line voltage in volts.
    pub voltage: f64,

    /// Reference load current in amps.
    pub current: f64,
}

impl AcReference {
    pub fn new(voltage: f64, current: f64) -> Self {
        Self { voltage, current }
    }
}

impl Default for AcReference {
    /// Nominal bench reference: 240 V, 15 A.
    fn default() -> Self {
        Self {
            voltage: 240.0,
            current: 15.0,
        }
    }
}

/// Calibration state of one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTokens {
    /// EUI-64 of the radio, when collected alongside the tokens.
    pub eui: Option<String>,

    /// Voltage scale factor in volts.
    pub voltage_factor: u32,

    /// Current scale factor in amps.
    pub current_factor: u32,

    /// Voltage gain token.
    pub voltage_gain: u32,

    /// Current gain token.
    pub current_gain: u32,
}

impl CalibrationTokens {
    /// Extract the calibration tokens from a raw `pinfo` report.
    pub fn parse(output: &str) -> Result<Self> {
        let voltage_factor = capture_u32(&VOLTAGE_FACTOR, output, "Voltage Factor", 10)?;
        let current_factor = capture_u32(&CURRENT_FACTOR, output, "Current Factor", 10)?;
        let voltage_gain = capture_u32(&VOLTAGE_GAIN, output, "VGain Token", 16)?;
        let current_gain = capture_u32(&CURRENT_GAIN, output, "IGain Token", 16)?;
        trace!("parsed calibration: vfactor {voltage_factor}, ifactor {current_factor}");
        Ok(Self {
            eui: None,
            voltage_factor,
            current_factor,
            voltage_gain,
            current_gain,
        })
    }

    /// The AC reference implied by the stored scale factors.
    pub fn ac_reference(&self) -> AcReference {
        AcReference::new(
            f64::from(self.voltage_factor),
            f64::from(self.current_factor),
        )
    }
}

fn capture_u32(pattern: &Regex, output: &str, field: &'static str, radix: u32) -> Result<u32> {
    let caps = pattern
        .captures(output)
        .ok_or_else(|| ParseError::MissingField {
            field,
            output: output.to_string(),
        })?;
    let value = &caps[1];
    u32::from_str_radix(value, radix).map_err(|source| {
        ParseError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        }
        .into()
    })
}
