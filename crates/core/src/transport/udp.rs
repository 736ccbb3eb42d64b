use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use crate::error::Result;
use crate::transport::PacketSink;

/// Server-side UDP socket pair for one session, bound during SETUP.
///
/// The RTP socket carries all outbound media. The RTCP socket is bound only
/// so the port advertised in the `Transport` response stays reserved — no
/// RTCP traffic is sent or processed. Both sockets are released when the
/// owning session is dropped.
#[derive(Debug)]
pub struct UdpTransport {
    rtp: UdpSocket,
    _rtcp: UdpSocket,
    rtp_port: u16,
    rtcp_port: u16,
}

impl UdpTransport {
    /// Bind the RTP/RTCP pair on the configured server ports.
    pub fn bind(rtp_port: u16, rtcp_port: u16) -> Result<Self> {
        let rtp = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, rtp_port))?;
        let rtcp = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, rtcp_port))?;
        tracing::debug!(rtp_port, rtcp_port, "server RTP/RTCP sockets bound");
        Ok(Self {
            rtp,
            _rtcp: rtcp,
            rtp_port,
            rtcp_port,
        })
    }

    /// Server-side RTP port, echoed in the `Transport` response header.
    pub fn rtp_port(&self) -> u16 {
        self.rtp_port
    }

    /// Server-side RTCP port, echoed in the `Transport` response header.
    pub fn rtcp_port(&self) -> u16 {
        self.rtcp_port
    }

    /// A [`PacketSink`] addressing every packet to `dest`.
    pub fn sink(&self, dest: SocketAddr) -> UdpSink<'_> {
        UdpSink {
            socket: &self.rtp,
            dest,
        }
    }
}

/// RTP-over-UDP sink: one `send_to` per packet, no buffering.
#[derive(Debug)]
pub struct UdpSink<'a> {
    socket: &'a UdpSocket,
    dest: SocketAddr,
}

impl PacketSink for UdpSink<'_> {
    fn send_packet(&mut self, packet: &[u8]) -> Result<usize> {
        Ok(self.socket.send_to(packet, self.dest)?)
    }
}
