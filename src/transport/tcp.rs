//! TCP transport
//!
//! One blocking connection to a distmap server, used by one request at a
//! time.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::time::Duration;

use parking_lot::Mutex;

use super::Transport;
use crate::config::Config;
use crate::error::{MapError, Result};
use crate::protocol::{read_reply, write_request, Reply, Request};

/// Blocking TCP transport
///
/// If an exchange fails halfway the stream can no longer be trusted to be
/// aligned on a frame boundary, so the transport marks itself broken and
/// fails every later request. Reconnecting is left to the owner. A request
/// too large to frame is refused before anything is written and leaves the
/// connection usable.
pub struct TcpTransport {
    peer_addr: String,
    channel: Mutex<Channel>,
}

struct Channel {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    broken: bool,
}

impl TcpTransport {
    /// Connect to `config.server_addr` with the configured timeouts
    pub fn connect(config: &Config) -> Result<Self> {
        let stream = TcpStream::connect(&config.server_addr).map_err(|e| {
            MapError::Transport(format!("connect to {}: {}", config.server_addr, e))
        })?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        if config.read_timeout_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;
        }
        if config.write_timeout_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
        }

        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| config.server_addr.clone());

        let read_stream = stream.try_clone()?;
        tracing::debug!("Connected to {}", peer_addr);

        Ok(Self {
            peer_addr,
            channel: Mutex::new(Channel {
                reader: BufReader::new(read_stream),
                writer: BufWriter::new(stream),
                broken: false,
            }),
        })
    }

    /// Connect to `addr` with default timeouts
    pub fn connect_addr(addr: impl Into<String>) -> Result<Self> {
        Self::connect(&Config::builder().server_addr(addr).build())
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Transport for TcpTransport {
    fn send(&self, request: &Request) -> Result<Reply> {
        let mut channel = self.channel.lock();
        if channel.broken {
            return Err(MapError::Transport(format!(
                "connection to {} is broken",
                self.peer_addr
            )));
        }

        tracing::trace!(request = request.name(), peer = %self.peer_addr, "sending");

        let exchange = write_request(&mut channel.writer, request)
            .and_then(|()| read_reply(&mut channel.reader));

        match exchange {
            Err(MapError::Encode(ref e)) => {
                tracing::warn!("Request to {} refused: {}", self.peer_addr, e);
            }
            Err(ref e) => {
                tracing::warn!("Exchange with {} failed: {}", self.peer_addr, e);
                channel.broken = true;
            }
            Ok(_) => {}
        }
        exchange
    }
}
