//! Per-connection RTSP session state (RFC 2326 §3, §12.37).
//!
//! A session is created by SETUP and owned by the connection that created
//! it — there is no cross-connection registry because the server services
//! one client at a time. The session carries the negotiated client ports,
//! the bound server-side UDP socket pair, and the playback state.
//!
//! ## Lifecycle
//!
//! ```text
//! SETUP          -> Ready    (UDP sockets bound, ports negotiated)
//! PLAY           -> Playing  (terminal: delivery loop until end of stream)
//! TCP disconnect -> dropped  (sockets released with the session)
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::transport::udp::UdpTransport;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Default session timeout in seconds, advertised in the `Session` header
/// (RFC 2326 §12.37).
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 60;

/// RTSP session state machine.
///
/// PLAY is terminal here: the delivery loop runs until the stream is
/// exhausted and the connection closes, so there is no Paused state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created via SETUP, not yet playing.
    Ready,
    /// Media delivery in progress.
    Playing,
}

/// A single RTSP session, created during SETUP.
///
/// Owns the server-side RTP/RTCP socket pair for its whole lifetime; the
/// sockets are released when the session is dropped, on every exit path.
#[derive(Debug)]
pub struct Session {
    /// Unique session identifier (16-char hex string).
    pub id: String,
    /// Current playback state.
    pub state: SessionState,
    /// Where RTP datagrams are addressed: client IP + negotiated RTP port.
    pub client_rtp_addr: SocketAddr,
    /// Client's RTCP port from the `Transport` header (recorded, unused —
    /// RTCP processing is out of scope).
    pub client_rtcp_port: u16,
    /// Server-side UDP socket pair bound during SETUP.
    pub transport: UdpTransport,
    /// Timeout advertised in the `Session` response header.
    pub timeout_secs: u64,
}

impl Session {
    /// Create a session with a fresh ID around an already-bound transport.
    pub fn new(client_rtp_addr: SocketAddr, client_rtcp_port: u16, transport: UdpTransport) -> Self {
        let id = SESSION_COUNTER.fetch_add(1, Ordering::SeqCst);
        let session = Session {
            id: format!("{:016X}", id),
            state: SessionState::Ready,
            client_rtp_addr,
            client_rtcp_port,
            transport,
            timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
        };
        tracing::info!(
            session_id = %session.id,
            client_rtp = %session.client_rtp_addr,
            "session created via SETUP"
        );
        session
    }

    /// Client's RTP port as negotiated in SETUP.
    pub fn client_rtp_port(&self) -> u16 {
        self.client_rtp_addr.port()
    }

    /// Format the `Session` response header value (RFC 2326 §12.37),
    /// e.g. `"0000000000000001;timeout=60"`.
    pub fn session_header_value(&self) -> String {
        format!("{};timeout={}", self.id, self.timeout_secs)
    }
}

/// Client transport parameters from the RTSP `Transport` header
/// (RFC 2326 §12.39).
///
/// Only the `client_port=RTP-RTCP` pair matters to this server; profiles
/// seen in the wild are `RTP/AVP` and `RTP/AVP/UDP`.
#[derive(Debug, Clone)]
pub struct TransportHeader {
    /// Client's requested RTP port.
    pub client_rtp_port: u16,
    /// Client's requested RTCP port (typically RTP + 1).
    pub client_rtcp_port: u16,
}

impl TransportHeader {
    /// Parse a `Transport` header value.
    ///
    /// Looks for `client_port=RTP-RTCP` among the semicolon-separated
    /// parameters; returns `None` when it is absent or malformed.
    pub fn parse(header: &str) -> Option<Self> {
        for part in header.split(';') {
            if let Some(ports) = part.trim().strip_prefix("client_port=") {
                let (rtp, rtcp) = ports.split_once('-')?;
                return Some(TransportHeader {
                    client_rtp_port: rtp.parse().ok()?,
                    client_rtcp_port: rtcp.parse().ok()?,
                });
            }
        }
        None
    }
}
