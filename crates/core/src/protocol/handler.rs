use std::fs::File;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::media::h264::ParameterSets;
use crate::media::reader::FrameReader;
use crate::protocol::request::RtspRequest;
use crate::protocol::response::RtspResponse;
use crate::protocol::sdp;
use crate::server::ServerConfig;
use crate::session::{Session, SessionState, TransportHeader};
use crate::transport::udp::UdpTransport;

/// How many frames DESCRIBE may scan looking for SPS/PPS. Annex-B files
/// converted from MP4 carry both in the first access unit.
const PARAMETER_SET_PROBE_FRAMES: usize = 32;

/// What the connection should do after a request has been handled.
pub enum Action {
    /// Write the response and await the next request.
    Reply(RtspResponse),
    /// Write the response, then enter the media delivery loop. PLAY is
    /// terminal — the connection closes when delivery ends.
    Play(RtspResponse),
}

/// Routes RTSP method requests for a single TCP connection.
///
/// Owns the session created by SETUP; the connection takes it back out for
/// the PLAY loop via [`take_session`](Self::take_session).
pub struct MethodHandler {
    config: Arc<ServerConfig>,
    client_addr: SocketAddr,
    session: Option<Session>,
}

impl MethodHandler {
    pub fn new(config: Arc<ServerConfig>, client_addr: SocketAddr) -> Self {
        MethodHandler {
            config,
            client_addr,
            session: None,
        }
    }

    pub fn handle(&mut self, request: &RtspRequest) -> Action {
        // CSeq is mandatory on every request and echoed on every reply
        // (RFC 2326 §12.17). Without one there is nothing to echo.
        let Some(cseq) = request.cseq() else {
            tracing::warn!(method = %request.method, "request without CSeq header");
            return Action::Reply(RtspResponse::bad_request());
        };
        let cseq = cseq.to_string();

        match request.method.as_str() {
            "OPTIONS" => Action::Reply(self.handle_options(&cseq)),
            "DESCRIBE" => Action::Reply(self.handle_describe(&cseq, &request.uri)),
            "SETUP" => Action::Reply(self.handle_setup(&cseq, request)),
            "PLAY" => self.handle_play(&cseq),
            _ => {
                tracing::warn!(method = %request.method, %cseq, "unsupported RTSP method");
                Action::Reply(RtspResponse::not_implemented().add_header("CSeq", &cseq))
            }
        }
    }

    /// Hand the SETUP-created session to the connection for the PLAY loop.
    pub fn take_session(&mut self) -> Option<Session> {
        self.session.take()
    }

    fn handle_options(&self, cseq: &str) -> RtspResponse {
        tracing::debug!(%cseq, "OPTIONS");
        RtspResponse::ok()
            .add_header("CSeq", cseq)
            .add_header("Public", "OPTIONS, DESCRIBE, SETUP, PLAY")
    }

    /// Host part of an RTSP URI (`rtsp://host:8554/path` → `host`), falling
    /// back to the peer address when the URI is unusable.
    fn host_from_uri(&self, uri: &str) -> String {
        if let Some(after_scheme) = uri.strip_prefix("rtsp://") {
            let host = after_scheme
                .split('/')
                .next()
                .and_then(|host_port| host_port.split(':').next())
                .unwrap_or("")
                .trim();
            if !host.is_empty() {
                return host.to_string();
            }
        }
        self.client_addr.ip().to_string()
    }

    fn handle_describe(&self, cseq: &str, uri: &str) -> RtspResponse {
        tracing::debug!(%cseq, uri, "DESCRIBE");

        let host = self.host_from_uri(uri);
        let params = self.probe_parameter_sets();
        let body = sdp::generate_sdp(&host, &self.config.sdp_session_name, params.as_ref());

        RtspResponse::ok()
            .add_header("CSeq", cseq)
            .add_header("Content-Base", uri)
            .add_header("Content-Type", "application/sdp")
            .with_body(body)
    }

    /// Pull SPS/PPS from the head of the media file for the SDP fmtp line.
    /// Failure only costs decoder-priming hints, so it downgrades to a log.
    fn probe_parameter_sets(&self) -> Option<ParameterSets> {
        let file = match File::open(&self.config.media_path) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(
                    path = %self.config.media_path.display(),
                    error = %e,
                    "media file not readable during DESCRIBE"
                );
                return None;
            }
        };
        let mut reader = FrameReader::with_chunk_size(file, self.config.read_chunk_size);
        ParameterSets::probe(&mut reader, PARAMETER_SET_PROBE_FRAMES)
    }

    fn handle_setup(&mut self, cseq: &str, request: &RtspRequest) -> RtspResponse {
        let Some(transport_header) = request.get_header("Transport") else {
            tracing::warn!(%cseq, "SETUP missing Transport header");
            return RtspResponse::bad_request().add_header("CSeq", cseq);
        };

        // Media goes out over UDP only; interleaved TCP (RFC 2326 §10.12)
        // is available as a sink but not negotiable here.
        if transport_header.contains("RTP/AVP/TCP") || transport_header.contains("interleaved=") {
            tracing::warn!(%cseq, transport = %transport_header, "client requested TCP transport");
            return RtspResponse::new(461, "Unsupported Transport")
                .add_header("CSeq", cseq)
                .add_header("Unsupported", "RTP/AVP/TCP (interleaved); use RTP/AVP (UDP)");
        }

        let Some(client_transport) = TransportHeader::parse(transport_header) else {
            tracing::warn!(%cseq, transport_header, "SETUP invalid Transport header");
            return RtspResponse::bad_request().add_header("CSeq", cseq);
        };

        // A repeated SETUP replaces the session; drop the old one first so
        // its sockets free the fixed server ports before rebinding.
        self.session = None;

        let transport = match UdpTransport::bind(self.config.rtp_port, self.config.rtcp_port) {
            Ok(transport) => transport,
            Err(e) => {
                tracing::error!(error = %e, "failed to bind server RTP/RTCP ports");
                return RtspResponse::new(500, "Internal Server Error").add_header("CSeq", cseq);
            }
        };

        let client_rtp_addr =
            SocketAddr::new(self.client_addr.ip(), client_transport.client_rtp_port);
        let session = Session::new(
            client_rtp_addr,
            client_transport.client_rtcp_port,
            transport,
        );

        let transport_response = format!(
            "RTP/AVP;unicast;client_port={}-{};server_port={}-{}",
            client_transport.client_rtp_port,
            client_transport.client_rtcp_port,
            session.transport.rtp_port(),
            session.transport.rtcp_port(),
        );
        let session_header = session.session_header_value();
        self.session = Some(session);

        RtspResponse::ok()
            .add_header("CSeq", cseq)
            .add_header("Transport", &transport_response)
            .add_header("Session", &session_header)
    }

    fn handle_play(&mut self, cseq: &str) -> Action {
        let Some(session) = self.session.as_mut() else {
            tracing::warn!(%cseq, "PLAY without a prior SETUP");
            return Action::Reply(
                RtspResponse::new(454, "Session Not Found").add_header("CSeq", cseq),
            );
        };

        session.state = SessionState::Playing;
        tracing::info!(session_id = %session.id, %cseq, "PLAY, starting delivery");

        Action::Play(
            RtspResponse::ok()
                .add_header("CSeq", cseq)
                .add_header("Range", "npt=0.000-")
                .add_header("Session", &session.session_header_value()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn make_handler(rtp_port: u16) -> MethodHandler {
        let config = ServerConfig {
            rtp_port,
            rtcp_port: rtp_port + 1,
            ..ServerConfig::default()
        };
        let client = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000);
        MethodHandler::new(Arc::new(config), client)
    }

    fn parse(raw: &str) -> RtspRequest {
        RtspRequest::parse(raw).unwrap()
    }

    #[test]
    fn options_lists_supported_methods() {
        let mut h = make_handler(46000);
        let req = parse("OPTIONS rtsp://127.0.0.1:8554 RTSP/1.0\r\nCSeq: 1\r\n\r\n");
        let Action::Reply(resp) = h.handle(&req) else {
            panic!("OPTIONS must not start playback");
        };
        let s = resp.serialize();
        assert!(s.contains("CSeq: 1\r\n"));
        assert!(s.contains("Public: OPTIONS, DESCRIBE, SETUP, PLAY\r\n"));
    }

    #[test]
    fn missing_cseq_is_bad_request() {
        let mut h = make_handler(46002);
        let req = parse("OPTIONS rtsp://127.0.0.1:8554 RTSP/1.0\r\n\r\n");
        let Action::Reply(resp) = h.handle(&req) else {
            panic!("expected a reply");
        };
        assert_eq!(resp.status_code, 400);
    }

    #[test]
    fn unsupported_method_gets_501() {
        let mut h = make_handler(46004);
        let req = parse("RECORD rtsp://127.0.0.1:8554 RTSP/1.0\r\nCSeq: 9\r\n\r\n");
        let Action::Reply(resp) = h.handle(&req) else {
            panic!("expected a reply");
        };
        assert_eq!(resp.status_code, 501);
        assert!(resp.serialize().contains("CSeq: 9\r\n"));
    }

    #[test]
    fn describe_echoes_content_base() {
        let mut h = make_handler(46006);
        let req = parse("DESCRIBE rtsp://192.168.50.236:8554 RTSP/1.0\r\nCSeq: 2\r\n\r\n");
        let Action::Reply(resp) = h.handle(&req) else {
            panic!("expected a reply");
        };
        let s = resp.serialize();
        assert!(s.contains("Content-Base: rtsp://192.168.50.236:8554\r\n"));
        assert!(s.contains("Content-Type: application/sdp\r\n"));
        assert!(s.contains("c=IN IP4 192.168.50.236\r\n"));
        assert!(s.contains("a=control:track0\r\n"));
    }

    #[test]
    fn setup_negotiates_ports_and_creates_session() {
        let mut h = make_handler(46008);
        let req = parse(
            "SETUP rtsp://127.0.0.1:8554/track0 RTSP/1.0\r\nCSeq: 3\r\n\
             Transport: RTP/AVP/UDP;unicast;client_port=13358-13359\r\n\r\n",
        );
        let Action::Reply(resp) = h.handle(&req) else {
            panic!("expected a reply");
        };
        let s = resp.serialize();
        assert!(s.contains("client_port=13358-13359"));
        assert!(s.contains("server_port=46008-46009"));
        assert!(s.contains("Session: "));
        assert!(h.session.is_some());
    }

    #[test]
    fn setup_without_transport_is_bad_request() {
        let mut h = make_handler(46010);
        let req = parse("SETUP rtsp://127.0.0.1:8554/track0 RTSP/1.0\r\nCSeq: 3\r\n\r\n");
        let Action::Reply(resp) = h.handle(&req) else {
            panic!("expected a reply");
        };
        assert_eq!(resp.status_code, 400);
    }

    #[test]
    fn setup_rejects_interleaved_tcp() {
        let mut h = make_handler(46012);
        let req = parse(
            "SETUP rtsp://127.0.0.1:8554/track0 RTSP/1.0\r\nCSeq: 3\r\n\
             Transport: RTP/AVP/TCP;unicast;interleaved=0-1\r\n\r\n",
        );
        let Action::Reply(resp) = h.handle(&req) else {
            panic!("expected a reply");
        };
        assert_eq!(resp.status_code, 461);
    }

    #[test]
    fn play_without_setup_is_session_not_found() {
        let mut h = make_handler(46014);
        let req = parse("PLAY rtsp://127.0.0.1:8554 RTSP/1.0\r\nCSeq: 4\r\n\r\n");
        let Action::Reply(resp) = h.handle(&req) else {
            panic!("PLAY without SETUP must not start playback");
        };
        assert_eq!(resp.status_code, 454);
    }

    #[test]
    fn play_after_setup_starts_delivery() {
        let mut h = make_handler(46016);
        let setup = parse(
            "SETUP rtsp://127.0.0.1:8554/track0 RTSP/1.0\r\nCSeq: 3\r\n\
             Transport: RTP/AVP/UDP;unicast;client_port=13358-13359\r\n\r\n",
        );
        h.handle(&setup);

        let play = parse("PLAY rtsp://127.0.0.1:8554 RTSP/1.0\r\nCSeq: 4\r\n\r\n");
        let Action::Play(resp) = h.handle(&play) else {
            panic!("PLAY after SETUP must start playback");
        };
        let s = resp.serialize();
        assert!(s.contains("Range: npt=0.000-\r\n"));
        assert!(s.contains("timeout="));

        let session = h.take_session().unwrap();
        assert_eq!(session.state, SessionState::Playing);
        assert_eq!(session.client_rtp_port(), 13358);
    }
}
