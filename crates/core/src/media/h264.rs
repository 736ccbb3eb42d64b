use std::io::{Read, Seek};

use base64::prelude::{BASE64_STANDARD, Engine as _};

use super::reader::FrameReader;
use super::rtp::{RTP_HEADER_SIZE, RtpHeader};

/// Largest RTP payload the packetizer will emit in one packet.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1400;

/// FU-A fragmentation unit NAL type (RFC 6184 §5.8).
const FU_A_TYPE: u8 = 28;

/// Sequence parameter set NAL type.
pub const NAL_TYPE_SPS: u8 = 7;
/// Picture parameter set NAL type.
pub const NAL_TYPE_PPS: u8 = 8;

/// H.264 RTP packetizer (RFC 6184).
///
/// Converts one NAL unit (start code already stripped) into RTP packets,
/// choosing between two packetization modes:
///
/// - **Single NAL Unit** (§5.6): the NAL fits `max_packet_size` and goes out
///   as one packet, payload verbatim.
/// - **FU-A fragmentation** (§5.8): the NAL is split into
///   `ceil(len / max_packet_size)` fragments, each prefixed by two bytes:
///
///   ```text
///   FU indicator:  [F|NRI|Type=28]    (forbidden+NRI bits of the NAL)
///   FU header:     [S|E|R|NAL_Type]   (S on first fragment, E on last)
///   ```
///
///   Concatenating the fragment payloads reproduces the NAL byte-for-byte.
///
/// The sequence number advances once per packet. The timestamp advances once
/// per frame — shared by all fragments — except for SPS/PPS, which carry no
/// picture and leave the clock alone.
///
/// ## Marker bit
///
/// RFC 6184 §5.1 wants the marker set on the last packet of an access unit.
/// The legacy server this crate replaces never set it, and most players cope,
/// so the default is off; [`strict_marker`](Self::set_strict_marker) opts in
/// to the RFC behavior.
#[derive(Debug)]
pub struct H264Packetizer {
    header: RtpHeader,
    max_packet_size: usize,
    timestamp_increment: u32,
    strict_marker: bool,
}

impl H264Packetizer {
    /// Create with explicit payload type and SSRC.
    pub fn new(pt: u8, ssrc: u32) -> Self {
        Self {
            header: RtpHeader::new(pt, ssrc),
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            timestamp_increment: 90000 / 25,
            strict_marker: false,
        }
    }

    /// Create with a random SSRC (RFC 3550 §8.1).
    pub fn with_random_ssrc(pt: u8) -> Self {
        Self {
            header: RtpHeader::with_random_ssrc(pt),
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            timestamp_increment: 90000 / 25,
            strict_marker: false,
        }
    }

    /// Change the single-packet payload ceiling.
    pub fn set_max_packet_size(&mut self, size: usize) {
        self.max_packet_size = size;
    }

    /// Set the per-frame timestamp step, `clock_rate / fps`
    /// (3600 for 25 fps at 90 kHz).
    pub fn set_timestamp_increment(&mut self, increment: u32) {
        self.timestamp_increment = increment;
    }

    /// Enable RFC 6184 marker-bit signaling on the last packet of a frame.
    pub fn set_strict_marker(&mut self, strict: bool) {
        self.strict_marker = strict;
    }

    /// Sequence number of the next packet to be emitted.
    pub fn sequence(&self) -> u16 {
        self.header.sequence()
    }

    /// Current RTP timestamp.
    pub fn timestamp(&self) -> u32 {
        self.header.timestamp()
    }

    /// Packetize one NAL unit into ready-to-send RTP packets.
    ///
    /// Each returned buffer is a complete packet: 12-byte header followed by
    /// the payload. Buffers are emitted in send order.
    pub fn packetize(&mut self, nal: &[u8]) -> Vec<Vec<u8>> {
        if nal.is_empty() {
            return Vec::new();
        }

        let nal_type = nal[0] & 0x1f;
        let parameter_set = nal_type == NAL_TYPE_SPS || nal_type == NAL_TYPE_PPS;
        let mut packets = Vec::new();

        if nal.len() <= self.max_packet_size {
            // Single NAL Unit mode (RFC 6184 §5.6)
            let marker = self.strict_marker && !parameter_set;
            let hdr = self.header.write(marker);
            let mut packet = Vec::with_capacity(RTP_HEADER_SIZE + nal.len());
            packet.extend_from_slice(&hdr);
            packet.extend_from_slice(nal);
            packets.push(packet);
        } else {
            // FU-A fragmentation (RFC 6184 §5.8)
            let fu_indicator = (nal[0] & 0xe0) | FU_A_TYPE;
            let fragments = nal.len().div_ceil(self.max_packet_size);

            for (i, chunk) in nal.chunks(self.max_packet_size).enumerate() {
                let first = i == 0;
                let last = i == fragments - 1;
                let fu_header = ((first as u8) << 7) | ((last as u8) << 6) | nal_type;

                let marker = self.strict_marker && last && !parameter_set;
                let hdr = self.header.write(marker);

                let mut packet = Vec::with_capacity(RTP_HEADER_SIZE + 2 + chunk.len());
                packet.extend_from_slice(&hdr);
                packet.push(fu_indicator);
                packet.push(fu_header);
                packet.extend_from_slice(chunk);
                packets.push(packet);
            }

            tracing::trace!(
                nal_type,
                nal_size = nal.len(),
                fragments,
                "FU-A fragmented NAL unit"
            );
        }

        // Parameter sets share the following picture's timestamp.
        if !parameter_set {
            self.header.advance_timestamp(self.timestamp_increment);
        }

        packets
    }
}

/// SPS/PPS pair pulled from the head of a stream, for SDP `a=fmtp`
/// generation (RFC 6184 §8.1).
#[derive(Debug, Clone)]
pub struct ParameterSets {
    pub sps: Vec<u8>,
    pub pps: Vec<u8>,
}

impl ParameterSets {
    /// Scan up to `max_frames` frames for an SPS and a PPS.
    ///
    /// Streams produced by `ffmpeg -bsf h264_mp4toannexb` carry both in the
    /// first access unit, so a small budget suffices.
    pub fn probe<R: Read + Seek>(reader: &mut FrameReader<R>, max_frames: usize) -> Option<Self> {
        let mut sps = None;
        let mut pps = None;

        for _ in 0..max_frames {
            let frame = match reader.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) | Err(_) => break,
            };
            match frame.nal_type() {
                NAL_TYPE_SPS if sps.is_none() => {
                    tracing::debug!(bytes = frame.nal().len(), "SPS found in bitstream");
                    sps = Some(frame.nal().to_vec());
                }
                NAL_TYPE_PPS if pps.is_none() => {
                    tracing::debug!(bytes = frame.nal().len(), "PPS found in bitstream");
                    pps = Some(frame.nal().to_vec());
                }
                _ => {}
            }
            if sps.is_some() && pps.is_some() {
                break;
            }
        }

        Some(Self {
            sps: sps?,
            pps: pps?,
        })
    }

    /// `profile-level-id` hex triple from SPS bytes 1–3 (RFC 6184 §8.1).
    pub fn profile_level_id(&self) -> Option<String> {
        if self.sps.len() < 4 {
            return None;
        }
        Some(format!(
            "{:02x}{:02x}{:02x}",
            self.sps[1], self.sps[2], self.sps[3]
        ))
    }

    /// Base64 `sprop-parameter-sets` value (RFC 6184 §8.1).
    pub fn sprop_parameter_sets(&self) -> String {
        format!(
            "{},{}",
            BASE64_STANDARD.encode(&self.sps),
            BASE64_STANDARD.encode(&self.pps)
        )
    }
}
