//! High-level operations for the metering console.

use std::sync::LazyLock;
use std::time::Duration;

use log::{debug, trace};
use regex::Regex;
use tokio::time::sleep;

use super::sample::CurrentVoltageSample;
use super::tokens::{AcReference, CalibrationTokens};
use crate::command::{CommandSession, Retries};
use crate::error::{ParseError, Result};
use crate::transport::TelnetConfig;

/// Lowest dim level the firmware reports.
pub const LEVEL_MIN: u32 = 0;

/// Highest dim level the firmware reports.
pub const LEVEL_MAX: u32 = 254;

/// How many times discovery commands are probed before giving up.
const PROBE_ATTEMPTS: u32 = 4;

/// Default pause between issuing a slow informational command and
/// reading its response.
const RESPONSE_DELAY: Duration = Duration::from_millis(500);

/// Relay control register writes.
const RELAY_ON: &str = "write 1 6 0 1 0x10 {01}";
const RELAY_OFF: &str = "write 1 6 0 1 0x10 {00}";

static PLOAD_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(cs[0-9]{4})_pload\r\n").expect("Invalid regex pattern"));
static EUI: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        "{}([0-9A-F]{{16}}){}",
        regex::escape("node [(>)"),
        regex::escape("]")
    );
    Regex::new(&pattern).expect("Invalid regex pattern")
});
static MFG_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"MFG String: ([^ \t\r\n]+)").expect("Invalid regex pattern"));
static LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Current = ([0-9]+)").expect("Invalid regex pattern"));
static SENSOR_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Sensor ID: ([0-9A-Fa-f]+)").expect("Invalid regex pattern"));

/// High-level client for one metering device console.
///
/// Wraps a [`CommandSession`] with the console commands the metering
/// firmware understands: discovery of the chip-specific command
/// prefix, identity queries, calibration readout, load sampling, relay
/// control, and dim level readback.
pub struct MeterCli {
    session: CommandSession,

    /// Pause between slow informational commands and their read.
    response_delay: Duration,
}

impl MeterCli {
    /// Wrap an existing command session.
    pub fn new(session: CommandSession) -> Self {
        Self {
            session,
            response_delay: RESPONSE_DELAY,
        }
    }

    /// Connect to the device console.
    pub async fn connect(config: TelnetConfig) -> Result<Self> {
        Ok(Self::new(CommandSession::connect(config).await?))
    }

    /// Adjust the pause used after slow informational commands.
    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    /// The underlying command session.
    pub fn session(&self) -> &CommandSession {
        &self.session
    }

    /// Mutable access to the underlying command session.
    pub fn session_mut(&mut self) -> &mut CommandSession {
        &mut self.session
    }

    /// Close the device connection.
    pub fn close(&mut self) {
        self.session.close();
    }

    /// Discover the chip-specific custom command prefix.
    ///
    /// The `cu` listing is probed until it mentions the load-report
    /// command, whose name carries the chip designator (for example
    /// `cs5490_pload`).
    pub async fn command_prefix(&mut self) -> Result<String> {
        self.session.wait_for_prompt().await?;

        let mut listing = String::new();
        for _ in 0..PROBE_ATTEMPTS {
            self.session.write_line("cu").await?;
            listing.push_str(&self.session.read().await?);
            if listing.contains("pload") {
                break;
            }
        }
        if !listing.contains("pload") {
            return Err(ParseError::MissingField {
                field: "pload command",
                output: listing,
            }
            .into());
        }

        let caps = PLOAD_PREFIX
            .captures(&listing)
            .ok_or_else(|| ParseError::MissingField {
                field: "pload prefix",
                output: listing.clone(),
            })?;
        let prefix = caps[1].to_string();
        debug!("custom command prefix: {prefix}");
        Ok(prefix)
    }

    /// Read the radio's EUI-64 from the `info` report.
    ///
    /// The report is probed a few times; the radio sometimes answers
    /// the first `info` with an unrelated status dump.
    pub async fn eui(&mut self) -> Result<String> {
        self.session.wait_for_prompt().await?;

        let mut output = String::new();
        for _ in 0..PROBE_ATTEMPTS {
            self.session.write_line("info").await?;
            sleep(self.response_delay).await;
            output = self.session.read().await?;
            if EUI.is_match(&output) {
                break;
            }
        }
        if output.is_empty() {
            return Err(ParseError::NoData {
                command: "info".to_string(),
            }
            .into());
        }
        let caps = EUI.captures(&output).ok_or_else(|| ParseError::MissingField {
            field: "EUI",
            output: output.clone(),
        })?;
        Ok(caps[1].to_string())
    }

    /// Read the manufacturing string from the `info` report.
    pub async fn mfg_string(&mut self) -> Result<String> {
        self.session.wait_for_prompt().await?;

        self.session.write_line("info").await?;
        sleep(self.response_delay).await;
        let output = self.session.read().await?;
        if output.is_empty() {
            return Err(ParseError::NoData {
                command: "info".to_string(),
            }
            .into());
        }
        let caps = MFG_STRING
            .captures(&output)
            .ok_or_else(|| ParseError::MissingField {
                field: "MFG String",
                output: output.clone(),
            })?;
        Ok(caps[1].to_string())
    }

    /// Read the calibration tokens via the chip's `pinfo` report.
    ///
    /// The command goes out without prompt synchronization, into
    /// whatever state the console is in.
    pub async fn calibration_tokens(&mut self, prefix: &str) -> Result<CalibrationTokens> {
        let command = format!("cu {prefix}_pinfo");
        self.session.write_line(&command).await?;
        sleep(self.response_delay).await;
        let output = self.session.read().await?;
        trace!("pinfo output: {output:?}");
        if output.is_empty() {
            return Err(ParseError::NoData { command }.into());
        }
        CalibrationTokens::parse(&output)
    }

    /// Collect the EUI and the calibration tokens in one sweep.
    pub async fn calibration_info(&mut self, prefix: &str) -> Result<CalibrationTokens> {
        let eui = self.eui().await?;
        let mut tokens = self.calibration_tokens(prefix).await?;
        tokens.eui = Some(eui);
        Ok(tokens)
    }

    /// Take one load sample via the chip's `pload` report.
    pub async fn load_sample(
        &mut self,
        prefix: &str,
        reference: &AcReference,
    ) -> Result<CurrentVoltageSample> {
        self.session.wait_for_prompt().await?;

        let command = format!("cu {prefix}_pload");
        self.session.write_line(&command).await?;
        sleep(self.response_delay).await;
        let output = self.session.read().await?;
        trace!("pload output: {output:?}");
        self.session.wait_for_prompt().await?;

        if output.is_empty() {
            return Err(ParseError::NoData { command }.into());
        }
        CurrentVoltageSample::parse(&output, reference)
    }

    /// Drive the load relay.
    ///
    /// Switching the relay on synchronizes to the prompt before and
    /// after the write. Switching it off fires the command without any
    /// synchronization.
    pub async fn set_relay(&mut self, on: bool) -> Result<()> {
        if on {
            self.session.wait_for_prompt().await?;
            self.session.write_line(RELAY_ON).await?;
            self.session.wait_for_prompt().await?;
        } else {
            self.session.write_line(RELAY_OFF).await?;
        }
        debug!("relay switched {}", if on { "on" } else { "off" });
        Ok(())
    }

    /// Read the current dim level, `LEVEL_MIN..=LEVEL_MAX`.
    pub async fn level(&mut self) -> Result<u32> {
        let result = self
            .session
            .send_match_with(
                "cu lev get",
                &LEVEL,
                Retries {
                    count: 2,
                    delay: Duration::from_millis(100),
                },
            )
            .await?;
        let value = result.capture(0).unwrap_or_default();
        value.parse().map_err(|source| {
            ParseError::InvalidNumber {
                field: "level",
                value: value.to_string(),
                source,
            }
            .into()
        })
    }

    /// Read the sensor ID pairing register.
    pub async fn sensor_id(&mut self) -> Result<String> {
        let result = self.session.send_match("cu si re", &SENSOR_ID).await?;
        Ok(result.capture(0).unwrap_or_default().to_string())
    }

    /// Clear the sensor ID pairing register.
    pub async fn clear_sensor_id(&mut self) -> Result<()> {
        self.session.send_expect("cu si cl", "Sensor ID: 0").await?;
        Ok(())
    }
}
