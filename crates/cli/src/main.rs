use std::io;
use std::path::PathBuf;

use clap::Parser;
use rtspvod::{Server, ServerConfig};

#[derive(Parser)]
#[command(
    name = "rtsp-vod",
    about = "RTSP server streaming a pre-recorded H.264 Annex-B file"
)]
struct Args {
    /// H.264 elementary stream to serve (Annex-B byte stream)
    file: PathBuf,

    /// Bind address (host:port)
    #[arg(long, short, default_value = "0.0.0.0:8554")]
    bind: String,

    /// Server-side RTP port
    #[arg(long, default_value_t = 55532)]
    rtp_port: u16,

    /// Server-side RTCP port
    #[arg(long, default_value_t = 55533)]
    rtcp_port: u16,

    /// Nominal frame rate for pacing and RTP timestamps
    #[arg(long, default_value_t = 25)]
    fps: u32,

    /// Largest RTP payload per packet
    #[arg(long, default_value_t = 1400)]
    max_packet_size: usize,

    /// Set the RTP marker bit on the last packet of each frame (RFC 6184)
    #[arg(long)]
    strict_marker: bool,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = ServerConfig {
        media_path: args.file,
        rtp_port: args.rtp_port,
        rtcp_port: args.rtcp_port,
        fps: args.fps,
        max_packet_size: args.max_packet_size,
        strict_marker: args.strict_marker,
        ..ServerConfig::default()
    };

    let mut server = Server::with_config(&args.bind, config);

    if let Err(e) = server.start() {
        eprintln!("Failed to start server: {}", e);
        std::process::exit(1);
    }

    println!("RTSP server on rtsp://{} — press Enter to stop", args.bind);
    let mut input = String::new();
    let _ = io::stdin().read_line(&mut input);

    server.stop();
}
