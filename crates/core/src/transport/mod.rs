//! Network transport for RTSP signaling and RTP media delivery.
//!
//! RTSP uses a split transport model:
//!
//! - **TCP** ([`tcp`]): carries RTSP request/response signaling. The accept
//!   loop services one connection at a time, sequentially.
//! - **UDP** ([`udp`]): carries RTP media packets over a socket pair bound
//!   during SETUP.
//!
//! Both RTP bindings expose the same [`PacketSink`] seam so the delivery
//! loop is transport-agnostic: datagrams for UDP, RFC 2326 §10.12
//! interleaved framing for TCP.

pub mod tcp;
pub mod udp;

use crate::error::Result;

/// Uniform send interface for serialized RTP packets.
///
/// One call transmits one complete packet — implementations do no
/// partial-packet buffering. Any error is fatal to the frame being sent;
/// the caller does not retry.
pub trait PacketSink {
    /// Send one packet, returning the number of bytes put on the wire.
    fn send_packet(&mut self, packet: &[u8]) -> Result<usize>;
}

pub use udp::UdpTransport;
