//! Media plumbing: Annex-B frame extraction and RTP packetization.
//!
//! The PLAY loop wires these pieces together:
//!
//! ```text
//! file ──▸ reader::FrameReader ──▸ h264::H264Packetizer ──▸ transport
//!          (one NAL per call)      (1..n RTP packets)
//! ```
//!
//! [`rtp::RtpHeader`] owns the per-session sequence/timestamp counters and
//! serializes the 12-byte fixed header (RFC 3550 §5.1). The H.264 payload
//! format follows RFC 6184: single NAL unit packets when the frame fits the
//! packet-size ceiling, FU-A fragmentation otherwise.

pub mod h264;
pub mod reader;
pub mod rtp;
