use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// A connected duplex byte stream implementing `Read + Write`.
///
/// Wraps the stream kinds Frame Streams senders and collectors actually
/// use: Unix domain sockets for same-host pipelines, TCP for remote ones.
/// Unlike a bare generic `Read`, a `Conn` can bound blocking reads with a
/// deadline, which the endpoint constructors use to fence the handshake.
pub struct Conn {
    inner: ConnInner,
}

enum ConnInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(TcpStream),
}

impl Conn {
    /// Connect to a listening Unix domain socket (blocking).
    #[cfg(unix)]
    pub fn connect_unix(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = std::os::unix::net::UnixStream::connect(path).map_err(|e| {
            TransportError::Connect {
                addr: path.display().to_string(),
                source: e,
            }
        })?;
        debug!(path = %path.display(), "connected to unix socket");
        Ok(Self::from(stream))
    }

    /// Connect to a TCP endpoint (blocking).
    pub fn connect_tcp(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<Self> {
        let stream = TcpStream::connect(&addr).map_err(|e| TransportError::Connect {
            addr: addr.to_string(),
            source: e,
        })?;
        debug!(%addr, "connected to tcp endpoint");
        Ok(Self::from(stream))
    }

    /// Set the read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            ConnInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            ConnInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set the write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            ConnInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            ConnInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            #[cfg(unix)]
            ConnInner::Unix(stream) => ConnInner::Unix(stream.try_clone()?),
            ConnInner::Tcp(stream) => ConnInner::Tcp(stream.try_clone()?),
        };
        Ok(Self { inner })
    }
}

impl Read for Conn {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            ConnInner::Unix(stream) => stream.read(buf),
            ConnInner::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for Conn {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            ConnInner::Unix(stream) => stream.write(buf),
            ConnInner::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            ConnInner::Unix(stream) => stream.flush(),
            ConnInner::Tcp(stream) => stream.flush(),
        }
    }
}

#[cfg(unix)]
impl From<std::os::unix::net::UnixStream> for Conn {
    fn from(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: ConnInner::Unix(stream),
        }
    }
}

impl From<TcpStream> for Conn {
    fn from(stream: TcpStream) -> Self {
        Self {
            inner: ConnInner::Tcp(stream),
        }
    }
}

impl std::fmt::Debug for Conn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            #[cfg(unix)]
            ConnInner::Unix(_) => "unix",
            ConnInner::Tcp(_) => "tcp",
        };
        f.debug_struct("Conn").field("kind", &kind).finish()
    }
}
