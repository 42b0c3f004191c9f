//! Command session built on the telnet transport.

use std::time::Duration;

use log::{debug, trace, warn};
use regex::Regex;
use tokio::time::sleep;

use super::result::MatchResult;
use crate::error::{CommandError, Result};
use crate::transport::{TelnetConfig, TelnetTransport};

/// Default console prompt marker.
pub const DEFAULT_PROMPT: &str = ">";

/// Default settle delay after a blank-line nudge.
const DEFAULT_SETTLE: Duration = Duration::from_millis(200);

/// Default spacing between samples while waiting for a string.
const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(250);

/// Options for prompt synchronization.
#[derive(Debug, Clone)]
pub struct PromptOptions {
    /// Nudge the console with a blank line before each check.
    pub send_blank_line: bool,

    /// How many nudge/check rounds to attempt before giving up.
    pub max_attempts: u32,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            send_blank_line: true,
            max_attempts: 5,
        }
    }
}

/// Retry policy for command exchanges.
#[derive(Debug, Clone, Copy)]
pub struct Retries {
    /// How many times to issue the command.
    pub count: u32,

    /// Delay between issuing the command and reading its response.
    pub delay: Duration,
}

impl Default for Retries {
    fn default() -> Self {
        Self {
            count: 3,
            delay: Duration::from_millis(100),
        }
    }
}

/// Line-oriented command session over a telnet transport.
///
/// The device console is half-duplex chatter: commands go down, text
/// comes back whenever the firmware feels like it. The session brings
/// order to that with prompt synchronization before each command and
/// bounded retries around every expected response.
pub struct CommandSession {
    transport: TelnetTransport,

    /// Prompt marker the device prints when idle.
    prompt: String,

    /// Settle delay after each blank-line nudge.
    settle: Duration,

    /// Spacing between samples in [`wait_for_string`](Self::wait_for_string).
    sample_interval: Duration,
}

impl CommandSession {
    /// Wrap an already connected transport.
    pub fn new(transport: TelnetTransport) -> Self {
        Self {
            transport,
            prompt: DEFAULT_PROMPT.to_string(),
            settle: DEFAULT_SETTLE,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }

    /// Connect to the device and wrap the transport in a session.
    pub async fn connect(config: TelnetConfig) -> Result<Self> {
        Ok(Self::new(TelnetTransport::connect(config).await?))
    }

    /// Set the prompt marker to synchronize on.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set the settle delay used after blank-line nudges.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Set the sample spacing used while waiting for a string.
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// The underlying transport.
    pub fn transport(&self) -> &TelnetTransport {
        &self.transport
    }

    /// Mutable access to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut TelnetTransport {
        &mut self.transport
    }

    /// Close the session's connection.
    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Read whatever the device has pushed since the last exchange.
    pub async fn read(&mut self) -> Result<String> {
        self.transport.read().await
    }

    /// Send a line to the device.
    pub async fn write_line(&mut self, text: &str) -> Result<()> {
        self.transport.write_line(text).await
    }

    /// Synchronize to an idle prompt with the default options.
    pub async fn wait_for_prompt(&mut self) -> Result<()> {
        self.wait_for_prompt_with(&PromptOptions::default()).await
    }

    /// Synchronize to an idle prompt.
    ///
    /// Stale output is discarded first, then the console is nudged with
    /// blank lines until the prompt marker shows up in a response.
    pub async fn wait_for_prompt_with(&mut self, options: &PromptOptions) -> Result<()> {
        // Discard whatever accumulated since the last exchange.
        self.transport.read().await?;

        for attempt in 1..=options.max_attempts {
            if options.send_blank_line {
                self.transport.write_line("").await?;
                sleep(self.settle).await;
            }
            let data = self.transport.read().await?;
            if data.contains(&self.prompt) {
                trace!("prompt detected on attempt {attempt}");
                return Ok(());
            }
        }

        warn!(
            "prompt {:?} not detected after {} attempts",
            self.prompt, options.max_attempts
        );
        Err(CommandError::PromptNotDetected {
            prompt: self.prompt.clone(),
            attempts: options.max_attempts,
        }
        .into())
    }

    /// Passively accumulate output until it contains `expected`.
    ///
    /// Nothing is sent; the console is sampled until the string arrives
    /// or the timeout lapses. Returns everything received while waiting.
    pub async fn wait_for_string(&mut self, expected: &str, timeout: Duration) -> Result<String> {
        let mut waited = Duration::ZERO;
        let mut data = String::new();
        while waited < timeout {
            data.push_str(&self.transport.read().await?);
            if data.contains(expected) {
                debug!("{expected:?} arrived after {waited:?}");
                return Ok(data);
            }
            sleep(self.sample_interval).await;
            waited += self.sample_interval;
        }
        Err(CommandError::Timeout {
            expected: expected.to_string(),
            elapsed: waited,
            received: data,
        }
        .into())
    }

    /// Send a command and require a fixed substring in the response,
    /// with the default retry policy.
    pub async fn send_expect(&mut self, command: &str, expected: &str) -> Result<String> {
        self.send_expect_with(command, expected, Retries::default())
            .await
    }

    /// Send a command and require a fixed substring in the response.
    ///
    /// The session synchronizes to the prompt first. Each attempt sends
    /// the command, waits out the retry delay, and reads one response;
    /// the first response containing `expected` is returned.
    pub async fn send_expect_with(
        &mut self,
        command: &str,
        expected: &str,
        retries: Retries,
    ) -> Result<String> {
        self.wait_for_prompt().await?;

        let mut data = String::new();
        for attempt in 1..=retries.count {
            trace!("sending {command:?} (attempt {attempt})");
            self.transport.write_line(command).await?;
            sleep(retries.delay).await;
            data = self.transport.read().await?;
            if data.contains(expected) {
                debug!("{command:?} acknowledged on attempt {attempt}");
                return Ok(data);
            }
        }

        warn!("{command:?} never acknowledged with {expected:?}");
        Err(CommandError::NotAcknowledged {
            command: command.to_string(),
            expected: expected.to_string(),
            received: data,
        }
        .into())
    }

    /// Send a command and match its response against a pattern, with
    /// the default retry policy.
    pub async fn send_match(&mut self, command: &str, pattern: &Regex) -> Result<MatchResult> {
        self.send_match_with(command, pattern, Retries::default())
            .await
    }

    /// Send a command and match its response against a pattern.
    ///
    /// Same exchange shape as [`send_expect_with`](Self::send_expect_with),
    /// but the response must satisfy a regex; the match and its captured
    /// groups are returned.
    pub async fn send_match_with(
        &mut self,
        command: &str,
        pattern: &Regex,
        retries: Retries,
    ) -> Result<MatchResult> {
        self.wait_for_prompt().await?;

        let mut data = String::new();
        for attempt in 1..=retries.count {
            trace!("sending {command:?} (attempt {attempt})");
            self.transport.write_line(command).await?;
            sleep(retries.delay).await;
            data = self.transport.read().await?;
            if let Some(result) = MatchResult::find(pattern, &data) {
                debug!("{command:?} matched on attempt {attempt}: {:?}", result.matched);
                return Ok(result);
            }
        }

        warn!("{command:?} response never matched {:?}", pattern.as_str());
        Err(CommandError::NotMatched {
            command: command.to_string(),
            pattern: pattern.as_str().to_string(),
            received: data,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testutil::{device_config, fast_session, spawn_device};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn test_wait_for_prompt_counts_blank_lines() {
        let (addr, device) = spawn_device(|stream| async move {
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            let mut blanks = 0u32;
            while let Ok(Some(line)) = lines.next_line().await {
                if line.is_empty() {
                    blanks += 1;
                    if blanks == 2 {
                        write.write_all(b"\r\n> ").await.unwrap();
                    }
                }
            }
            blanks
        })
        .await;

        let mut session = fast_session(TelnetTransport::connect(device_config(addr)).await.unwrap());
        session.wait_for_prompt().await.unwrap();
        session.close();

        assert_eq!(device.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_wait_for_prompt_gives_up() {
        let (addr, device) = spawn_device(|stream| async move {
            let (read, _write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            let mut blanks = 0u32;
            while let Ok(Some(line)) = lines.next_line().await {
                if line.is_empty() {
                    blanks += 1;
                }
            }
            blanks
        })
        .await;

        let mut session = fast_session(TelnetTransport::connect(device_config(addr)).await.unwrap());
        let err = session.wait_for_prompt().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Command(CommandError::PromptNotDetected { attempts: 5, .. })
        ));
        session.close();

        assert_eq!(device.await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_wait_for_prompt_without_nudges_sends_nothing() {
        let (addr, device) = spawn_device(|stream| async move {
            let (read, _write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            let mut received = 0u32;
            while let Ok(Some(_)) = lines.next_line().await {
                received += 1;
            }
            received
        })
        .await;

        let mut session = fast_session(TelnetTransport::connect(device_config(addr)).await.unwrap());
        let options = PromptOptions {
            send_blank_line: false,
            max_attempts: 3,
        };
        let err = session.wait_for_prompt_with(&options).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Command(CommandError::PromptNotDetected { attempts: 3, .. })
        ));
        session.close();

        assert_eq!(device.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_send_match_retries_until_pattern() {
        let (addr, device) = spawn_device(|stream| async move {
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            let mut commands = 0u32;
            while let Ok(Some(line)) = lines.next_line().await {
                if line.is_empty() {
                    write.write_all(b"> ").await.unwrap();
                } else if line == "cu lev get" {
                    commands += 1;
                    if commands == 1 {
                        write.write_all(b"(still waking up)\r\n").await.unwrap();
                    } else {
                        write.write_all(b"Current = 128\r\n> ").await.unwrap();
                    }
                }
            }
            commands
        })
        .await;

        let mut session = fast_session(TelnetTransport::connect(device_config(addr)).await.unwrap());
        let pattern = Regex::new(r"Current = ([0-9]+)").unwrap();
        let result = session.send_match("cu lev get", &pattern).await.unwrap();
        assert_eq!(result.capture(0), Some("128"));
        session.close();

        assert_eq!(device.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_send_match_exhausts_retries() {
        let (addr, device) = spawn_device(|stream| async move {
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            let mut commands = 0u32;
            while let Ok(Some(line)) = lines.next_line().await {
                if line.is_empty() {
                    write.write_all(b"> ").await.unwrap();
                } else {
                    commands += 1;
                    write.write_all(b"garbage\r\n").await.unwrap();
                }
            }
            commands
        })
        .await;

        let mut session = fast_session(TelnetTransport::connect(device_config(addr)).await.unwrap());
        let pattern = Regex::new(r"Current = ([0-9]+)").unwrap();
        let err = session
            .send_match_with(
                "cu lev get",
                &pattern,
                Retries {
                    count: 2,
                    delay: Duration::from_millis(10),
                },
            )
            .await
            .unwrap_err();
        match err {
            Error::Command(CommandError::NotMatched {
                command, received, ..
            }) => {
                assert_eq!(command, "cu lev get");
                assert!(received.contains("garbage"));
            }
            other => panic!("unexpected error: {other}"),
        }
        session.close();

        assert_eq!(device.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_send_expect_round_trip() {
        let (addr, device) = spawn_device(|stream| async move {
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.is_empty() {
                    write.write_all(b"> ").await.unwrap();
                } else if line == "cu si cl" {
                    write.write_all(b"Sensor ID: 0\r\n> ").await.unwrap();
                }
            }
        })
        .await;

        let mut session = fast_session(TelnetTransport::connect(device_config(addr)).await.unwrap());
        let response = session.send_expect("cu si cl", "Sensor ID: 0").await.unwrap();
        assert!(response.contains("Sensor ID: 0"));
        session.close();
        device.await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_string_accumulates() {
        let (addr, device) = spawn_device(|mut stream| async move {
            stream.write_all(b"spinning up...\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(60)).await;
            stream.write_all(b"READY\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        })
        .await;

        let mut session = fast_session(TelnetTransport::connect(device_config(addr)).await.unwrap());
        let data = session
            .wait_for_string("READY", Duration::from_millis(500))
            .await
            .unwrap();
        assert!(data.contains("spinning up"));
        assert!(data.contains("READY"));
        session.close();
        device.await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_string_times_out() {
        let (addr, device) = spawn_device(|mut stream| async move {
            stream.write_all(b"nothing useful\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
        })
        .await;

        let mut session = fast_session(TelnetTransport::connect(device_config(addr)).await.unwrap());
        let err = session
            .wait_for_string("READY", Duration::from_millis(60))
            .await
            .unwrap_err();
        match err {
            Error::Command(CommandError::Timeout {
                expected, received, ..
            }) => {
                assert_eq!(expected, "READY");
                assert!(received.contains("nothing useful"));
            }
            other => panic!("unexpected error: {other}"),
        }
        session.close();
        device.await.unwrap();
    }
}
