//! Transport for the client side of the simulation stream
//!
//! The stream is full duplex: one thread reads frames while callers write
//! them. [`Connection`] is the sending half shared by callers; the receiving
//! half is any `Read` handed to the ingestion loop.

use crate::framing::write_frame;
use crate::{Error, Result};
use std::io::BufWriter;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Sending half of a connection-oriented transport (e.g., TCP)
///
/// Implementations serialize concurrent senders so frames never interleave.
pub trait Connection: Send + Sync {
    /// Encode and send one frame, reliably and in order
    fn send_frame(&self, payload: &[u8]) -> Result<()>;

    /// Check if the connection is still open locally
    fn is_connected(&self) -> bool;

    /// Get the remote address
    fn remote_addr(&self) -> Option<SocketAddr>;

    /// Close both directions of the connection
    ///
    /// Idempotent. The underlying resource is released on the first call
    /// only; a blocked reader on the other half wakes up with end-of-stream.
    fn close(&self) -> Result<()>;
}

/// TCP connection to the simulation
#[derive(Debug)]
pub struct TcpConnection {
    /// Writer lock around encode-and-send
    writer: Mutex<BufWriter<TcpStream>>,
    /// Handle used for shutdown without taking the writer lock
    control: TcpStream,
    remote: Option<SocketAddr>,
    closed: AtomicBool,
}

impl TcpConnection {
    /// Connect and split the stream
    ///
    /// Returns the sending half and a cloned stream for the reader thread.
    pub fn connect(
        addr: impl ToSocketAddrs,
        timeout: Option<Duration>,
    ) -> Result<(Self, TcpStream)> {
        let stream = match timeout {
            Some(timeout) => connect_with_timeout(addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };
        stream.set_nodelay(true)?;
        Self::from_stream(stream)
    }

    /// Split an already connected stream
    pub fn from_stream(stream: TcpStream) -> Result<(Self, TcpStream)> {
        let remote = stream.peer_addr().ok();
        let reader = stream.try_clone()?;
        let control = stream.try_clone()?;
        let connection = Self {
            writer: Mutex::new(BufWriter::new(stream)),
            control,
            remote,
            closed: AtomicBool::new(false),
        };
        Ok((connection, reader))
    }
}

/// Try every resolved address in turn, like `TcpStream::connect` does
fn connect_with_timeout(addr: impl ToSocketAddrs, timeout: Duration) -> Result<TcpStream> {
    let mut last_err = None;
    for addr in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err
        .unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "address resolved to nothing",
            )
        })
        .into())
}

impl Connection for TcpConnection {
    fn send_frame(&self, payload: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        write_frame(&mut *writer, payload)?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match self.control.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Peer already went away
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
