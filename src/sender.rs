use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use tracing::debug;

/// Sends encoded bundles to a single destination, one datagram each.
pub struct MessageSender {
    socket: UdpSocket,
    destination: SocketAddr,
}

fn bind_sender(destination: &SocketAddr) -> io::Result<UdpSocket> {
    let (domain, any) = match destination {
        SocketAddr::V4(_) => (Domain::IPV4, IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        SocketAddr::V6(_) => (Domain::IPV6, IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.bind(&SockAddr::from(SocketAddr::new(any, 0)))?;

    if destination.ip().is_multicast() {
        match destination {
            SocketAddr::V4(_) => {
                socket.set_multicast_loop_v4(true)?;
                socket.set_multicast_ttl_v4(1)?;
            }
            SocketAddr::V6(_) => {
                socket.set_multicast_loop_v6(true)?;
                socket.set_multicast_hops_v6(1)?;
            }
        }
        debug!("Sending to multicast group {}", destination);
    }
    Ok(socket.into())
}

impl MessageSender {
    pub fn new(destination: SocketAddr) -> io::Result<Self> {
        let socket = bind_sender(&destination)?;
        Ok(Self {
            socket,
            destination,
        })
    }

    pub fn send(&self, payload: &[u8]) -> io::Result<usize> {
        self.socket.send_to(payload, self.destination)
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }
}

/// Send errors that won't go away by trying again next tick.
pub fn is_fatal_send_error(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::PermissionDenied
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::InvalidInput
    )
}
