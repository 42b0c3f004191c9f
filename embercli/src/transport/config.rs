//! Telnet connection configuration.

use std::time::Duration;

use secrecy::SecretString;

/// Default TCP port for the device's telnet console.
pub const DEFAULT_PORT: u16 = 4900;

/// Default quiescence window between read passes.
pub const DEFAULT_QUIESCENCE: Duration = Duration::from_millis(100);

/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Telnet connection configuration.
#[derive(Debug, Clone)]
pub struct TelnetConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// Console port (default: 4900).
    pub port: u16,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Quiescence window: a read pass ends once the line has been
    /// silent for this long.
    pub quiescence: Duration,
}

impl TelnetConfig {
    /// Create a configuration for the given host and port with default
    /// timeouts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            quiescence: DEFAULT_QUIESCENCE,
        }
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the quiescence window used to delimit read passes.
    pub fn with_quiescence(mut self, quiescence: Duration) -> Self {
        self.quiescence = quiescence;
        self
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for TelnetConfig {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

/// Login credentials for devices that gate the console behind a
/// `login:` / `password:` exchange.
///
/// The password is held as a [`SecretString`] so it stays out of debug
/// output and logs.
#[derive(Debug)]
pub struct Credentials {
    /// Username sent at the login prompt.
    pub username: String,

    /// Password sent at the password prompt.
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}
