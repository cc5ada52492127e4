use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;
use thiserror::Error;

/// Error of the [`Transport`] construction and datagram operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Binding the socket failed, typically because the port is already
    /// in use. A bind conflict is a configuration problem and is never
    /// retried.
    #[error("failed to bind 127.0.0.1:{port}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    /// A receive ran into the socket timeout. Recoverable: the listener
    /// spends one unit of its retry budget and tries again.
    #[error("receive timed out")]
    RecvTimeout,

    /// Any other socket error. Fail-stop for the affected endpoint.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One loopback UDP socket.
///
/// Exactly one socket per endpoint, opened at construction and closed
/// on drop. [`Transport::listener`] binds the configured port and
/// applies the receive timeout; [`Transport::sender`] binds an
/// ephemeral port (a UDP socket must be bound before it can send) and
/// only ever transmits.
#[derive(Debug)]
pub struct Transport {
    socket: UdpSocket,
}

impl Transport {
    /// Bind the receiving socket on `127.0.0.1:port`.
    ///
    /// `port` 0 asks the OS for an ephemeral port; read the assignment
    /// back with [`local_port`]. Every receive on this socket is
    /// bounded by `recv_timeout`.
    ///
    /// [`local_port`]: Transport::local_port
    pub fn listener(port: u16, recv_timeout: Duration) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
            .map_err(|source| TransportError::Bind { port, source })?;
        socket.set_read_timeout(Some(recv_timeout))?;
        Ok(Self { socket })
    }

    /// Bind the sending socket on an ephemeral loopback port.
    pub fn sender() -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))
            .map_err(|source| TransportError::Bind { port: 0, source })?;
        Ok(Self { socket })
    }

    /// Receive one datagram into `buf`, returning the payload length.
    ///
    /// A datagram longer than `buf` is truncated to `buf.len()` and the
    /// excess is discarded, per UDP semantics. An expired socket
    /// timeout is classified as [`TransportError::RecvTimeout`] so the
    /// caller can tell it apart from a hard failure.
    pub fn recv(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.socket.recv_from(buf) {
            Ok((len, _peer)) => Ok(len),
            // WouldBlock on unix, TimedOut on windows
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                Err(TransportError::RecvTimeout)
            }
            Err(error) => Err(TransportError::Io(error)),
        }
    }

    /// Send `payload` as one datagram to `127.0.0.1:port`, returning
    /// the number of bytes sent.
    pub fn send_to(&self, payload: &[u8], port: u16) -> Result<usize, TransportError> {
        let target = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        Ok(self.socket.send_to(payload, target)?)
    }

    /// The port this socket is actually bound to.
    pub fn local_port(&self) -> Result<u16, TransportError> {
        Ok(self.socket.local_addr()?.port())
    }
}
