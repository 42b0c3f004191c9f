//! Shared helpers for exercising the library against scripted devices.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::command::CommandSession;
use crate::transport::{TelnetConfig, TelnetTransport};

/// Spawn a one-connection fake device and hand the accepted stream to
/// the script. Returns the listening address and the script's join
/// handle.
pub(crate) async fn spawn_device<F, Fut, T>(script: F) -> (SocketAddr, JoinHandle<T>)
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        script(stream).await
    });
    (addr, handle)
}

/// Line-oriented fake device: blank lines are answered with a prompt,
/// listed commands with their canned response. Returns every non-blank
/// line received, in order.
pub(crate) async fn scripted_device(
    responses: &'static [(&'static str, &'static str)],
) -> (SocketAddr, JoinHandle<Vec<String>>) {
    spawn_device(move |stream| async move {
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        let mut received = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.is_empty() {
                write.write_all(b"> ").await.unwrap();
                continue;
            }
            if let Some((_, reply)) = responses.iter().find(|(command, _)| *command == line) {
                write.write_all(reply.as_bytes()).await.unwrap();
            }
            received.push(line);
        }
        received
    })
    .await
}

/// Connection settings tuned for loopback tests.
pub(crate) fn device_config(addr: SocketAddr) -> TelnetConfig {
    TelnetConfig::new(addr.ip().to_string(), addr.port())
        .with_connect_timeout(Duration::from_secs(5))
        .with_quiescence(Duration::from_millis(25))
}

/// Session with delays tuned for loopback tests.
pub(crate) fn fast_session(transport: TelnetTransport) -> CommandSession {
    CommandSession::new(transport)
        .with_settle(Duration::from_millis(10))
        .with_sample_interval(Duration::from_millis(20))
}
