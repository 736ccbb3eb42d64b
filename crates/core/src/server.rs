use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use parking_lot::RwLock;

use crate::error::{Result, RtspError};
use crate::media::h264::DEFAULT_MAX_PACKET_SIZE;
use crate::media::reader::DEFAULT_CHUNK_SIZE;
use crate::transport::tcp;

/// Server configuration, shared read-only across the accept loop and
/// protocol handlers.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path of the H.264 Annex-B elementary stream to serve
    /// (`ffmpeg -i in.mp4 -codec copy -bsf h264_mp4toannexb -f h264 out.h264`).
    pub media_path: PathBuf,
    /// Fixed server-side RTP port, bound at SETUP.
    pub rtp_port: u16,
    /// Fixed server-side RTCP port, bound at SETUP.
    pub rtcp_port: u16,
    /// Largest RTP payload per packet; bigger NALs are FU-A fragmented.
    pub max_packet_size: usize,
    /// Nominal frame rate used for pacing and the RTP timestamp step.
    pub fps: u32,
    /// Frame reader working-buffer size; bounds the largest NAL unit.
    pub read_chunk_size: usize,
    /// Set the RTP marker bit on the last packet of each frame
    /// (RFC 6184 §5.1). Off by default to match the legacy server.
    pub strict_marker: bool,
    /// SDP session name (`s=` line).
    pub sdp_session_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            media_path: PathBuf::from("test.h264"),
            rtp_port: 55532,
            rtcp_port: 55533,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            fps: 25,
            read_chunk_size: DEFAULT_CHUNK_SIZE,
            strict_marker: false,
            sdp_session_name: "Stream".to_string(),
        }
    }
}

/// RTSP server serving one pre-recorded H.264 stream.
///
/// [`start`](Self::start) binds the listen socket and spawns the accept
/// loop on a background thread. Clients are serviced sequentially — one
/// session at a time, by design.
pub struct Server {
    bind_addr: String,
    config: Arc<ServerConfig>,
    running: Arc<AtomicBool>,
    viewer: Arc<RwLock<Option<Viewer>>>,
}

impl Server {
    /// Create a server with default configuration for the given stream file.
    pub fn new(bind_addr: &str, media_path: impl Into<PathBuf>) -> Self {
        Self::with_config(
            bind_addr,
            ServerConfig {
                media_path: media_path.into(),
                ..ServerConfig::default()
            },
        )
    }

    /// Create a server with explicit configuration.
    pub fn with_config(bind_addr: &str, config: ServerConfig) -> Self {
        Self {
            bind_addr: bind_addr.to_string(),
            config: Arc::new(config),
            running: Arc::new(AtomicBool::new(false)),
            viewer: Arc::new(RwLock::new(None)),
        }
    }

    /// Bind the RTSP listen socket and start accepting clients.
    ///
    /// A bind failure here aborts startup; everything after this point is
    /// handled per-session.
    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RtspError::AlreadyRunning);
        }

        let listener = TcpListener::bind(&self.bind_addr)?;
        listener.set_nonblocking(true)?;

        self.running.store(true, Ordering::SeqCst);

        let config = self.config.clone();
        let viewer = self.viewer.clone();
        let running = self.running.clone();

        tracing::info!(
            addr = %self.bind_addr,
            media = %self.config.media_path.display(),
            "RTSP server listening"
        );

        thread::spawn(move || {
            tcp::accept_loop(listener, config, viewer, running);
        });

        Ok(())
    }

    /// Ask the accept loop to exit. An in-flight session runs to completion.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("server stopping");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the client currently in PLAY, if any.
    pub fn viewer(&self) -> Option<Viewer> {
        self.viewer.read().clone()
    }

    /// The server's configuration.
    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }
}

/// Information about the client currently receiving media.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub session_id: String,
    pub client_addr: String,
    pub client_rtp_port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_twice_is_an_error() {
        let mut server = Server::new("127.0.0.1:0", "missing.h264");
        // Port 0 is rejected later by clients but fine for lifecycle checks.
        server.start().expect("first start");
        assert!(server.is_running());
        assert!(matches!(server.start(), Err(RtspError::AlreadyRunning)));
        server.stop();
        assert!(!server.is_running());
    }

    #[test]
    fn no_viewer_before_play() {
        let server = Server::new("127.0.0.1:0", "missing.h264");
        assert!(server.viewer().is_none());
    }
}
