//! DPDK telemetry socket connector.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

/// Response buffer size used until the init banner reports a usable one.
const DEFAULT_MAX_OUTPUT_LEN: usize = 16 * 1024;

/// Upper bound for the init banner read.
const MAX_INIT_MESSAGE_LEN: usize = 1024;

/// A live channel to one telemetry endpoint, capable of a single
/// synchronous command/response exchange.
///
/// Any returned error is fatal for the current poll; retry policy belongs
/// to the caller.
#[allow(async_fn_in_trait)]
pub trait Connector {
    /// Send one command with its opaque parameter string and receive one
    /// raw response.
    async fn send(&mut self, command: &str, params: &str) -> io::Result<Vec<u8>>;
}

/// Banner the DPDK runtime writes to every client on connect.
#[derive(Debug, Deserialize)]
struct InitMessage {
    version: String,
    pid: u32,
    max_output_len: usize,
}

/// Connector for the DPDK telemetry unix socket.
///
/// Connects lazily and tears the stream down on any I/O error, so the
/// next poll starts with a fresh connection.
pub struct DpdkConnector {
    socket_path: PathBuf,
    access_timeout: Duration,
    max_output_len: usize,
    stream: Option<UnixStream>,
}

impl DpdkConnector {
    /// Create a connector for the given socket path.
    ///
    /// `access_timeout` bounds every individual socket operation
    /// (connect, banner read, command write, response read).
    pub fn new(socket_path: impl Into<PathBuf>, access_timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            access_timeout,
            max_output_len: DEFAULT_MAX_OUTPUT_LEN,
            stream: None,
        }
    }

    async fn connect(&mut self) -> io::Result<()> {
        let mut stream = timeout(self.access_timeout, UnixStream::connect(&self.socket_path))
            .await
            .map_err(|_| timeout_error("connect"))??;

        // The runtime greets every new client with a JSON banner that
        // carries the maximum response size it will ever produce.
        let mut buf = vec![0u8; MAX_INIT_MESSAGE_LEN];
        let n = timeout(self.access_timeout, stream.read(&mut buf))
            .await
            .map_err(|_| timeout_error("banner read"))??;

        self.max_output_len = match serde_json::from_slice::<InitMessage>(&buf[..n]) {
            Ok(init) if init.max_output_len > 0 => {
                tracing::debug!(
                    socket = %self.socket_path.display(),
                    version = %init.version,
                    pid = init.pid,
                    max_output_len = init.max_output_len,
                    "Connected to DPDK telemetry socket"
                );
                init.max_output_len
            }
            Ok(_) => DEFAULT_MAX_OUTPUT_LEN,
            Err(e) => {
                tracing::debug!(
                    socket = %self.socket_path.display(),
                    error = %e,
                    "Unreadable init banner, using default response buffer size"
                );
                DEFAULT_MAX_OUTPUT_LEN
            }
        };

        self.stream = Some(stream);
        Ok(())
    }

    async fn exchange(&mut self, message: &str) -> io::Result<Vec<u8>> {
        if self.stream.is_none() {
            self.connect().await?;
        }

        let deadline = self.access_timeout;
        let max_output_len = self.max_output_len;
        let Some(stream) = self.stream.as_mut() else {
            return Err(io::Error::other("telemetry socket not connected"));
        };

        timeout(deadline, stream.write_all(message.as_bytes()))
            .await
            .map_err(|_| timeout_error("write"))??;

        let mut buf = vec![0u8; max_output_len];
        let n = timeout(deadline, stream.read(&mut buf))
            .await
            .map_err(|_| timeout_error("read"))??;

        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "telemetry socket closed by peer",
            ));
        }

        buf.truncate(n);
        Ok(buf)
    }
}

impl Connector for DpdkConnector {
    async fn send(&mut self, command: &str, params: &str) -> io::Result<Vec<u8>> {
        let message = if params.is_empty() {
            command.to_string()
        } else {
            format!("{},{}", command, params)
        };

        match self.exchange(&message).await {
            Ok(response) => Ok(response),
            Err(e) => {
                // Drop the stream so the next poll reconnects.
                self.stream = None;
                Err(e)
            }
        }
    }
}

fn timeout_error(op: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("telemetry socket {} timed out", op),
    )
}
