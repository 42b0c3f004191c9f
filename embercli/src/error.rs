//! Error types for embercli.

use std::io;
use std::num::ParseIntError;
use std::time::Duration;
use thiserror::Error;

/// Main error type for embercli operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Telnet transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Command exchange errors
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Device output parsing errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Transport layer errors (TCP connection, telnet negotiation, login).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Connection attempt timed out
    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The device never presented the expected login or password prompt
    #[error("Login failed: no {stage} prompt, received: {received:?}")]
    LoginFailed {
        stage: &'static str,
        received: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Command layer errors (prompt synchronization, response matching).
#[derive(Error, Debug)]
pub enum CommandError {
    /// Prompt never appeared after repeated blank-line nudges
    #[error("Prompt {prompt:?} not detected after {attempts} attempts")]
    PromptNotDetected { prompt: String, attempts: u32 },

    /// Expected string did not arrive within the allotted time
    #[error("Timed out after {elapsed:?} waiting for {expected:?}, received: {received:?}")]
    Timeout {
        expected: String,
        elapsed: Duration,
        received: String,
    },

    /// Command response never contained the expected acknowledgment
    #[error("Command {command:?} not acknowledged with {expected:?}, last response: {received:?}")]
    NotAcknowledged {
        command: String,
        expected: String,
        received: String,
    },

    /// Command response never matched the expected pattern
    #[error("Command {command:?} response did not match {pattern:?}, last response: {received:?}")]
    NotMatched {
        command: String,
        pattern: String,
        received: String,
    },
}

/// Device output parsing errors (register decode, field extraction).
#[derive(Error, Debug)]
pub enum ParseError {
    /// A required field was absent from the device output
    #[error("Unable to parse {field} from device output: {output:?}")]
    MissingField { field: &'static str, output: String },

    /// The device returned nothing at all for a command
    #[error("No data received after {command:?} command")]
    NoData { command: String },

    /// A captured field failed numeric conversion
    #[error("Malformed {field} value {value:?}: {source}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Result type alias using embercli's Error.
pub type Result<T> = std::result::Result<T, Error>;
