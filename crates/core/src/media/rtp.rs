use rand::RngExt;

/// RTP fixed header size in bytes (RFC 3550 §5.1).
pub const RTP_HEADER_SIZE: usize = 12;

/// Dynamic payload type for H.264 video (RFC 3551 §6).
pub const PAYLOAD_TYPE_H264: u8 = 96;

/// Dynamic payload type for AAC audio. Reserved for a future audio track;
/// no AAC packetizer exists in this crate.
pub const PAYLOAD_TYPE_AAC: u8 = 97;

/// RTP fixed header state (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Owned by a packetizer for the lifetime of one session. Tracks:
///
/// - **Sequence number**: 16-bit, wrapping — incremented on every packet
///   written, including each fragment of a fragmented frame.
/// - **Timestamp**: 32-bit media clock, advanced once per source frame via
///   [`advance_timestamp`](Self::advance_timestamp) — never per packet.
/// - **SSRC**: constant for the session.
///
/// Version is always 2. Padding, extension, and CSRC count are always 0.
#[derive(Debug)]
pub struct RtpHeader {
    /// RTP payload type (7-bit, RFC 3551).
    pub pt: u8,
    /// Synchronization source identifier (RFC 3550 §8.1).
    pub ssrc: u32,
    sequence: u16,
    timestamp: u32,
}

impl RtpHeader {
    /// Create header state with an explicit SSRC.
    pub fn new(pt: u8, ssrc: u32) -> Self {
        tracing::debug!(
            pt,
            ssrc = format_args!("{:#010X}", ssrc),
            "RTP header state created"
        );
        Self {
            pt,
            ssrc,
            sequence: 0,
            timestamp: 0,
        }
    }

    /// Create header state with a random SSRC (RFC 3550 §8.1).
    pub fn with_random_ssrc(pt: u8) -> Self {
        let ssrc = rand::rng().random::<u32>();
        Self::new(pt, ssrc)
    }

    /// Sequence number the next [`write`](Self::write) call will emit.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Current media timestamp.
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Serialize a 12-byte RTP fixed header and advance the sequence number.
    ///
    /// All multi-byte fields go out in network byte order. The `marker` bit
    /// signals the last packet of an access unit for H.264 (RFC 6184 §5.1).
    pub fn write(&mut self, marker: bool) -> [u8; RTP_HEADER_SIZE] {
        let mut header = [0u8; RTP_HEADER_SIZE];
        header[0] = 2 << 6;
        header[1] = ((marker as u8) << 7) | self.pt;
        header[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        header[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        header[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        self.sequence = self.sequence.wrapping_add(1);
        header
    }

    /// Advance the timestamp by `increment` clock units.
    ///
    /// For video on the 90 kHz clock the per-frame increment is
    /// `90000 / fps` (3600 at 25 fps).
    pub fn advance_timestamp(&mut self, increment: u32) {
        self.timestamp = self.timestamp.wrapping_add(increment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_header() -> RtpHeader {
        RtpHeader::new(PAYLOAD_TYPE_H264, 0x8892_3423)
    }

    #[test]
    fn version_is_2() {
        let mut h = make_header();
        let buf = h.write(false);
        assert_eq!(buf[0] >> 6, 2);
    }

    #[test]
    fn flags_and_csrc_count_zero() {
        let mut h = make_header();
        let buf = h.write(false);
        assert_eq!(buf[0] & 0x3f, 0);
    }

    #[test]
    fn marker_bit() {
        let mut h = make_header();
        let no_marker = h.write(false);
        assert_eq!(no_marker[1] & 0x80, 0);

        let with_marker = h.write(true);
        assert_eq!(with_marker[1] & 0x80, 0x80);
    }

    #[test]
    fn payload_type_written() {
        let mut h = make_header();
        let buf = h.write(false);
        assert_eq!(buf[1] & 0x7f, PAYLOAD_TYPE_H264);
    }

    #[test]
    fn sequence_increments_per_write() {
        let mut h = make_header();
        let b1 = h.write(false);
        let b2 = h.write(false);
        let seq1 = u16::from_be_bytes([b1[2], b1[3]]);
        let seq2 = u16::from_be_bytes([b2[2], b2[3]]);
        assert_eq!(seq2, seq1 + 1);
    }

    #[test]
    fn sequence_wraps_at_u16_max() {
        let mut h = make_header();
        h.sequence = u16::MAX;
        let buf = h.write(false);
        assert_eq!(u16::from_be_bytes([buf[2], buf[3]]), u16::MAX);
        assert_eq!(h.sequence(), 0);
    }

    #[test]
    fn ssrc_written_big_endian() {
        let mut h = make_header();
        let buf = h.write(false);
        let ssrc = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
        assert_eq!(ssrc, 0x8892_3423);
    }

    #[test]
    fn timestamp_advances_only_on_request() {
        let mut h = make_header();
        h.write(false);
        assert_eq!(h.timestamp(), 0);
        h.advance_timestamp(3600);
        assert_eq!(h.timestamp(), 3600);
        h.advance_timestamp(3600);
        assert_eq!(h.timestamp(), 7200);
    }

    #[test]
    fn random_ssrc_differs() {
        let h1 = RtpHeader::with_random_ssrc(PAYLOAD_TYPE_H264);
        let h2 = RtpHeader::with_random_ssrc(PAYLOAD_TYPE_H264);
        assert_ne!(h1.ssrc, h2.ssrc);
    }
}
