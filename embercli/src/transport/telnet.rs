//! Telnet transport over TCP.

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use log::{debug, trace};
use secrecy::ExposeSecret;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use super::config::{Credentials, TelnetConfig};
use super::negotiation::{IAC, TelnetParser};
use crate::error::{Result, TransportError};

/// Read chunk size for draining the socket.
const READ_CHUNK: usize = 4096;

/// Telnet transport wrapping a TCP stream.
///
/// Reads are quiescence-paced: [`read`](Self::read) drains whatever the
/// device has already sent, then waits out a short silence window and
/// drains again until the line goes quiet. Telnet negotiation is handled
/// transparently, so callers only ever see printable console text.
#[derive(Debug)]
pub struct TelnetTransport {
    /// The TCP stream. `None` once closed or disconnected by the peer.
    stream: Option<TcpStream>,

    /// Configuration used for this connection.
    config: TelnetConfig,

    /// Active quiescence window, adjustable at runtime.
    quiescence: Duration,
}

impl TelnetTransport {
    /// Connect to the device console.
    pub async fn connect(config: TelnetConfig) -> Result<Self> {
        let addr = config.socket_addr();
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout(config.connect_timeout))?
            .map_err(|source| TransportError::ConnectionFailed {
                host: config.host.clone(),
                port: config.port,
                source,
            })?;
        debug!("connected to {addr}");
        Ok(Self {
            stream: Some(stream),
            quiescence: config.quiescence,
            config,
        })
    }

    /// Whether the transport still holds an open connection.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Configuration this transport was opened with.
    pub fn config(&self) -> &TelnetConfig {
        &self.config
    }

    /// Adjust the quiescence window for subsequent reads.
    pub fn set_quiescence(&mut self, quiescence: Duration) {
        self.quiescence = quiescence;
    }

    /// Current quiescence window.
    pub fn quiescence(&self) -> Duration {
        self.quiescence
    }

    /// Read everything the device has to say right now.
    ///
    /// Drains the bytes already buffered on the socket, then keeps
    /// draining as long as new data arrives within one quiescence
    /// window of the last. Returns the empty string when the device had
    /// nothing to say or the transport is closed. End of stream marks
    /// the transport disconnected and returns whatever preceded it.
    pub async fn read(&mut self) -> Result<String> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(String::new());
        };

        let mut parser = TelnetParser::new();
        let mut chunk = BytesMut::with_capacity(READ_CHUNK);
        let mut open = true;

        'pass: loop {
            // Drain every byte that is ready right now.
            loop {
                match stream.try_read_buf(&mut chunk) {
                    Ok(0) => {
                        open = false;
                        break 'pass;
                    }
                    Ok(_) => Self::ingest(stream, &mut parser, &mut chunk).await?,
                    Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) => return Err(TransportError::Io(e).into()),
                }
            }

            // Wait out the quiescence window; another round only if the
            // device kept talking.
            tokio::time::sleep(self.quiescence).await;
            match stream.try_read_buf(&mut chunk) {
                Ok(0) => {
                    open = false;
                    break 'pass;
                }
                Ok(_) => Self::ingest(stream, &mut parser, &mut chunk).await?,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break 'pass,
                Err(e) => return Err(TransportError::Io(e).into()),
            }
        }

        if !open {
            debug!("device closed the connection");
            self.stream = None;
        }
        let text = parser.into_text();
        if !text.is_empty() {
            trace!("read {} chars: {text:?}", text.len());
        }
        Ok(text)
    }

    /// Send a line of text, appending the line terminator.
    pub async fn write_line(&mut self, text: &str) -> Result<()> {
        self.send(text, true).await
    }

    /// Send text without a line terminator.
    pub async fn write(&mut self, text: &str) -> Result<()> {
        self.send(text, false).await
    }

    /// Drive a `login:` / `password:` exchange.
    ///
    /// The timeout doubles as the quiescence window for the reads
    /// involved, so slow banners get the full window to land. Returns
    /// the accumulated transcript of the exchange.
    pub async fn login(&mut self, credentials: &Credentials, timeout: Duration) -> Result<String> {
        let saved = self.quiescence;
        self.quiescence = timeout;
        let outcome = self.login_exchange(credentials).await;
        self.quiescence = saved;
        outcome
    }

    /// Close the connection. Safe to call repeatedly; reads and writes
    /// become no-ops afterwards.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!("closing connection to {}", self.config.socket_addr());
            drop(stream);
        }
    }

    async fn login_exchange(&mut self, credentials: &Credentials) -> Result<String> {
        let mut transcript = self.read().await?;
        if !transcript.trim_end().ends_with(':') {
            return Err(TransportError::LoginFailed {
                stage: "login",
                received: transcript,
            }
            .into());
        }

        self.write_line(&credentials.username).await?;
        transcript.push_str(&self.read().await?);
        if !transcript.trim_end().ends_with(':') {
            return Err(TransportError::LoginFailed {
                stage: "password",
                received: transcript,
            }
            .into());
        }

        self.write_line(credentials.password.expose_secret()).await?;
        transcript.push_str(&self.read().await?);
        debug!("login exchange complete for {}", credentials.username);
        Ok(transcript)
    }

    async fn send(&mut self, text: &str, terminate: bool) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            trace!("write on closed transport dropped: {text:?}");
            return Ok(());
        };
        let mut buf = Vec::with_capacity(text.len() + 1);
        for byte in text.bytes() {
            buf.push(byte);
            if byte == IAC {
                // A literal escape byte goes out doubled.
                buf.push(IAC);
            }
        }
        if terminate {
            buf.push(b'\n');
        }
        stream.write_all(&buf).await.map_err(TransportError::Io)?;
        trace!("wrote {text:?}");
        Ok(())
    }

    /// Feed a drained chunk through the parser and send any negotiation
    /// replies straight back.
    async fn ingest(
        stream: &mut TcpStream,
        parser: &mut TelnetParser,
        chunk: &mut BytesMut,
    ) -> Result<()> {
        parser.feed(chunk);
        chunk.clear();
        let replies = parser.take_replies();
        if !replies.is_empty() {
            trace!("answering negotiation with {} bytes", replies.len());
            stream
                .write_all(&replies)
                .await
                .map_err(TransportError::Io)?;
        }
        Ok(())
    }
}
