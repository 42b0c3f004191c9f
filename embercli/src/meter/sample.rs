//! Load sampling: paired RMS current and voltage readings.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::register::{RMS_DIVISOR, register_fraction_hex};
use super::tokens::AcReference;
use crate::error::{ParseError, Result};

static RAW_IRMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Raw IRMS: ([0-9A-F]{8})").expect("Invalid regex pattern"));
static RAW_VRMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Raw VRMS: ([0-9A-F]{8})").expect("Invalid regex pattern"));
static ONOFF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Changing OnOff .*").expect("Invalid regex pattern"));

/// One load sample in line units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentVoltageSample {
    /// RMS current in amps.
    pub current: f64,

    /// RMS voltage in volts.
    pub voltage: f64,
}

impl CurrentVoltageSample {
    /// Extract a sample from a raw `pload` report, scaling the register
    /// fractions by the AC reference levels.
    pub fn parse(output: &str, reference: &AcReference) -> Result<Self> {
        // Relay state transitions show up in the report; they are
        // informational only.
        if let Some(onoff) = ONOFF.find(output) {
            debug!("{}", onoff.as_str());
        }
        let current = scaled(&RAW_IRMS, output, "Raw IRMS", reference.current)?;
        let voltage = scaled(&RAW_VRMS, output, "Raw VRMS", reference.voltage)?;
        Ok(Self { current, voltage })
    }
}

impl std::fmt::Display for CurrentVoltageSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} A, {:.1} V", self.current, self.voltage)
    }
}

fn scaled(pattern: &Regex, output: &str, field: &'static str, reference: f64) -> Result<f64> {
    let caps = pattern
        .captures(output)
        .ok_or_else(|| ParseError::MissingField {
            field,
            output: output.to_string(),
        })?;
    Ok(register_fraction_hex(&caps[1])? * reference / RMS_DIVISOR)
}
