//! PLAY delivery loop: file → frame reader → packetizer → packet sink.
//!
//! Frames are read one NAL unit at a time, packetized, sent, and paced with
//! a fixed sleep of one frame interval (40 ms at 25 fps). The loop ends when
//! the elementary stream is exhausted; a send failure aborts the remaining
//! fragments of the current frame and propagates — there is no retry.

use std::fs::File;
use std::io::{Read, Seek};
use std::thread;
use std::time::Duration;

use crate::error::Result;
use crate::media::h264::H264Packetizer;
use crate::media::reader::FrameReader;
use crate::media::rtp::PAYLOAD_TYPE_H264;
use crate::server::ServerConfig;
use crate::session::Session;
use crate::transport::PacketSink;

/// Counters from one completed delivery run.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeliveryReport {
    /// Source frames (NAL units) consumed.
    pub frames: u64,
    /// RTP packets emitted, fragments included.
    pub packets: u64,
    /// Bytes put on the wire.
    pub bytes: u64,
}

/// Stream the configured media file to a session's client.
///
/// Opens the file fresh, builds a packetizer with a random SSRC, and runs
/// [`deliver`] against the session's UDP sink. One full pass, no looping.
pub fn play(config: &ServerConfig, session: &mut Session) -> Result<DeliveryReport> {
    let file = File::open(&config.media_path)?;

    let fps = config.fps.max(1);
    let mut packetizer = H264Packetizer::with_random_ssrc(PAYLOAD_TYPE_H264);
    packetizer.set_max_packet_size(config.max_packet_size);
    packetizer.set_timestamp_increment(90000 / fps);
    packetizer.set_strict_marker(config.strict_marker);

    tracing::info!(
        session_id = %session.id,
        path = %config.media_path.display(),
        client = %session.client_rtp_addr,
        fps,
        "delivery started"
    );

    let mut sink = session.transport.sink(session.client_rtp_addr);
    deliver(
        file,
        &mut packetizer,
        &mut sink,
        config.read_chunk_size,
        Duration::from_millis(1000 / fps as u64),
    )
}

/// Drive one full pass of the source through the packetizer into the sink.
///
/// Generic over source and sink so tests can run against in-memory buffers
/// with zero pacing.
pub fn deliver<R: Read + Seek, S: PacketSink>(
    source: R,
    packetizer: &mut H264Packetizer,
    sink: &mut S,
    chunk_size: usize,
    frame_interval: Duration,
) -> Result<DeliveryReport> {
    let mut reader = FrameReader::with_chunk_size(source, chunk_size);
    let mut report = DeliveryReport::default();

    while let Some(frame) = reader.next_frame()? {
        let packets = packetizer.packetize(frame.nal());
        for packet in &packets {
            report.bytes += sink.send_packet(packet)? as u64;
            report.packets += 1;
        }
        report.frames += 1;

        if !frame_interval.is_zero() {
            thread::sleep(frame_interval);
        }
    }

    tracing::info!(
        frames = report.frames,
        packets = report.packets,
        bytes = report.bytes,
        "delivery finished, stream exhausted"
    );
    Ok(report)
}
