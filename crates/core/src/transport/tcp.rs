use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::Result;
use crate::protocol::{Action, MethodHandler, RtspRequest, RtspResponse};
use crate::server::{ServerConfig, Viewer};
use crate::stream;
use crate::transport::PacketSink;

/// Sequential TCP accept loop.
///
/// Services exactly one client at a time: a connection is handled to
/// completion before `accept` is polled again, so a second client waits in
/// the listen backlog until the first session's socket closes. The listener
/// is non-blocking and the `running` flag is checked between accepts with a
/// 50 ms poll so [`Server::stop`](crate::Server::stop) can end the loop.
pub fn accept_loop(
    listener: TcpListener,
    config: Arc<ServerConfig>,
    viewer: Arc<RwLock<Option<Viewer>>>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, _)) => {
                if stream.set_nonblocking(false).is_err() {
                    continue;
                }
                Connection::handle(stream, config.clone(), viewer.clone(), running.clone());
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            }
        }
    }
    tracing::debug!("accept loop exited");
}

/// A single RTSP client connection.
struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    handler: MethodHandler,
    peer_addr: SocketAddr,
    config: Arc<ServerConfig>,
    viewer: Arc<RwLock<Option<Viewer>>>,
}

impl Connection {
    /// Entry point: set up the connection and run its request loop to
    /// completion. All per-session resources are dropped on return.
    fn handle(
        stream: TcpStream,
        config: Arc<ServerConfig>,
        viewer: Arc<RwLock<Option<Viewer>>>,
        running: Arc<AtomicBool>,
    ) {
        let peer_addr = match stream.peer_addr() {
            Ok(addr) => addr,
            Err(_) => return,
        };

        tracing::info!(%peer_addr, "client connected");

        let reader_stream = match stream.try_clone() {
            Ok(s) => s,
            Err(_) => return,
        };

        let handler = MethodHandler::new(config.clone(), peer_addr);
        let mut conn = Connection {
            reader: BufReader::new(reader_stream),
            writer: stream,
            handler,
            peer_addr,
            config,
            viewer,
        };

        let reason = conn.run(&running);
        *conn.viewer.write() = None;

        tracing::info!(%peer_addr, reason, "client disconnected");
    }

    /// RTSP request/response loop. Returns the reason for exiting.
    fn run(&mut self, running: &Arc<AtomicBool>) -> &'static str {
        while running.load(Ordering::SeqCst) {
            let mut request_text = String::new();
            loop {
                let mut line = String::new();
                match self.reader.read_line(&mut line) {
                    Ok(0) => return "connection closed by client",
                    Ok(_) => {
                        request_text.push_str(&line);
                        if line == "\r\n" || line == "\n" {
                            break;
                        }
                    }
                    Err(_) => return "read error",
                }
            }

            if request_text.trim().is_empty() {
                continue;
            }

            let request = match RtspRequest::parse(&request_text) {
                Ok(request) => request,
                Err(e) => {
                    // Reply instead of dropping the request on the floor;
                    // a silently-ignored request leaves the client hanging.
                    tracing::warn!(peer = %self.peer_addr, error = %e, "bad request");
                    if self.write_response(&RtspResponse::bad_request()).is_err() {
                        return "write error";
                    }
                    continue;
                }
            };

            tracing::debug!(
                peer = %self.peer_addr,
                method = %request.method,
                uri = %request.uri,
                "request"
            );

            match self.handler.handle(&request) {
                Action::Reply(response) => {
                    if self.write_response(&response).is_err() {
                        return "write error";
                    }
                }
                Action::Play(response) => {
                    if self.write_response(&response).is_err() {
                        return "write error";
                    }
                    self.play();
                    return "stream finished";
                }
            }
        }

        "server shutting down"
    }

    /// Run the delivery loop for the SETUP-created session, then let the
    /// connection close. PLAY is terminal.
    fn play(&mut self) {
        let Some(mut session) = self.handler.take_session() else {
            return;
        };

        *self.viewer.write() = Some(Viewer {
            session_id: session.id.clone(),
            client_addr: self.peer_addr.to_string(),
            client_rtp_port: session.client_rtp_port(),
        });

        match stream::play(&self.config, &mut session) {
            Ok(report) => tracing::info!(
                peer = %self.peer_addr,
                frames = report.frames,
                packets = report.packets,
                "stream complete"
            ),
            Err(e) => tracing::warn!(peer = %self.peer_addr, error = %e, "stream aborted"),
        }
    }

    fn write_response(&mut self, response: &RtspResponse) -> std::io::Result<()> {
        tracing::debug!(peer = %self.peer_addr, status = response.status_code, "response");
        self.writer.write_all(response.serialize().as_bytes())
    }
}

/// RTP-over-TCP sink using RFC 2326 §10.12 interleaved binary framing.
///
/// Each packet is prefixed with a 4-byte header — `'$'`, the channel
/// identifier, and a 16-bit big-endian payload length — and written with a
/// single call, matching the no-partial-buffering contract of
/// [`PacketSink`]. Alternate transport; the server's SETUP path negotiates
/// UDP only.
#[derive(Debug)]
pub struct InterleavedSink<W> {
    writer: W,
    channel: u8,
}

impl<W: Write> InterleavedSink<W> {
    pub fn new(writer: W, channel: u8) -> Self {
        Self { writer, channel }
    }
}

impl<W: Write> PacketSink for InterleavedSink<W> {
    fn send_packet(&mut self, packet: &[u8]) -> Result<usize> {
        let mut framed = Vec::with_capacity(4 + packet.len());
        framed.push(b'$');
        framed.push(self.channel);
        framed.extend_from_slice(&(packet.len() as u16).to_be_bytes());
        framed.extend_from_slice(packet);

        self.writer.write_all(&framed)?;
        Ok(framed.len())
    }
}
