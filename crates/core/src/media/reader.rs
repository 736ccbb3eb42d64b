//! Annex-B elementary stream frame reader.
//!
//! H.264 Annex-B streams delimit NAL units with start codes — 3-byte
//! (`00 00 01`) or 4-byte (`00 00 00 01`). [`FrameReader`] walks any
//! `Read + Seek` source and yields one NAL unit per call:
//!
//! 1. Read a chunk of up to `chunk_size` bytes.
//! 2. Require a start code at offset 0 — anything else means the stream is
//!    malformed or alignment was lost.
//! 3. Scan from offset 3 for the next start code; the bytes before it are
//!    the frame.
//! 4. Seek the source back so the next call resumes exactly at the
//!    discovered start code.
//!
//! A NAL unit larger than the chunk cannot be distinguished from the end of
//! the file, so it terminates the stream. Likewise the final NAL of a file
//! has no trailing start code and is dropped. Both are inherited limitations
//! of the one-pass design, characterized (not fixed) by the tests below.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Result, RtspError};

/// Default working-buffer size. Bounds the largest NAL unit the reader can
/// return in one piece.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// One NAL unit pulled from the stream, leading start code included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    start_code_len: usize,
}

impl Frame {
    /// Full frame bytes as they appeared in the stream.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// NAL unit bytes with the start code stripped — what the packetizer
    /// consumes.
    pub fn nal(&self) -> &[u8] {
        &self.data[self.start_code_len..]
    }

    /// NAL unit type from the low 5 bits of the first payload byte
    /// (7 = SPS, 8 = PPS, 5 = IDR slice, ...).
    pub fn nal_type(&self) -> u8 {
        self.nal().first().map_or(0, |b| b & 0x1f)
    }

    /// Length of the leading start code (3 or 4).
    pub fn start_code_len(&self) -> usize {
        self.start_code_len
    }
}

/// Sequential NAL unit reader over an Annex-B source.
#[derive(Debug)]
pub struct FrameReader<R> {
    source: R,
    chunk_size: usize,
}

impl<R: Read + Seek> FrameReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_chunk_size(source, DEFAULT_CHUNK_SIZE)
    }

    /// Create a reader with an explicit working-buffer size.
    pub fn with_chunk_size(source: R, chunk_size: usize) -> Self {
        Self { source, chunk_size }
    }

    /// Read the next frame. `Ok(None)` signals end of stream.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut buf = vec![0u8; self.chunk_size];
        let filled = read_up_to(&mut self.source, &mut buf)?;
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);

        let start_code_len = leading_start_code(&buf).ok_or(RtspError::Format(
            "frame does not begin with an Annex-B start code",
        ))?;

        let Some(end) = find_start_code(&buf, 3) else {
            // No terminating start code in this chunk. Either the file ended
            // or the frame spans the chunk boundary; both end the stream.
            tracing::debug!(bytes = filled, "no further start code, end of stream");
            return Ok(None);
        };

        // Return the read-ahead to the source so the next call starts at the
        // discovered start code.
        self.source
            .seek(SeekFrom::Current(end as i64 - filled as i64))?;
        buf.truncate(end);

        Ok(Some(Frame {
            data: buf,
            start_code_len,
        }))
    }
}

/// Fill `buf` as far as the source allows. Returns the number of bytes read;
/// 0 only at end of stream.
fn read_up_to<R: Read>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Start code length at the head of `buf`, if any.
fn leading_start_code(buf: &[u8]) -> Option<usize> {
    if buf.starts_with(&[0, 0, 0, 1]) {
        Some(4)
    } else if buf.starts_with(&[0, 0, 1]) {
        Some(3)
    } else {
        None
    }
}

/// Byte offset of the first start code at or after `from`. For a 4-byte code
/// the offset of its first zero byte is returned.
fn find_start_code(buf: &[u8], from: usize) -> Option<usize> {
    if buf.len() < 3 {
        return None;
    }
    for i in from..=buf.len() - 3 {
        if buf[i..i + 3] == [0, 0, 1] {
            return Some(i);
        }
        if buf[i..i + 3] == [0, 0, 0] && buf.get(i + 3) == Some(&1) {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Three NALs with mixed start codes; the last one is terminated by
    /// nothing, so the reader drops it.
    fn sample_stream() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&[0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1e]); // SPS
        data.extend_from_slice(&[0, 0, 1, 0x68, 0xce, 0x38, 0x80]); // PPS
        data.extend_from_slice(&[0, 0, 0, 1, 0x65, 0x88, 0x84]); // IDR, dropped
        data
    }

    #[test]
    fn yields_frames_with_expected_byte_ranges() {
        let mut reader = FrameReader::new(Cursor::new(sample_stream()));

        let f1 = reader.next_frame().unwrap().unwrap();
        assert_eq!(f1.as_bytes(), &[0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1e]);
        assert_eq!(f1.start_code_len(), 4);
        assert_eq!(f1.nal(), &[0x67, 0x42, 0x00, 0x1e]);
        assert_eq!(f1.nal_type(), 7);

        let f2 = reader.next_frame().unwrap().unwrap();
        assert_eq!(f2.as_bytes(), &[0, 0, 1, 0x68, 0xce, 0x38, 0x80]);
        assert_eq!(f2.start_code_len(), 3);
        assert_eq!(f2.nal_type(), 8);
    }

    #[test]
    fn trailing_frame_without_terminator_is_end_of_stream() {
        let mut reader = FrameReader::new(Cursor::new(sample_stream()));
        reader.next_frame().unwrap().unwrap();
        reader.next_frame().unwrap().unwrap();
        // The IDR slice has no following start code — the reader cannot
        // bound it and reports end of stream instead.
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn exact_frame_count_then_end_of_stream() {
        let mut data = Vec::new();
        let n = 5;
        for i in 0..n {
            data.extend_from_slice(&[0, 0, 0, 1, 0x41, i as u8]);
        }
        data.extend_from_slice(&[0, 0, 0, 1]); // terminator for the last frame

        let mut reader = FrameReader::new(Cursor::new(data));
        for i in 0..n {
            let frame = reader.next_frame().unwrap().unwrap();
            assert_eq!(frame.nal(), &[0x41, i as u8]);
        }
        assert!(reader.next_frame().unwrap().is_none());
        // Stays at end of stream on repeated calls.
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn empty_source_is_end_of_stream() {
        let mut reader = FrameReader::new(Cursor::new(Vec::new()));
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn garbage_prefix_is_a_format_error() {
        let mut reader = FrameReader::new(Cursor::new(vec![0xff, 0xfe, 0x00, 0x01, 0x02]));
        match reader.next_frame() {
            Err(RtspError::Format(_)) => {}
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn frame_spanning_chunk_ends_stream() {
        let mut data = vec![0, 0, 0, 1];
        data.extend_from_slice(&[0x41; 64]);
        data.extend_from_slice(&[0, 0, 0, 1, 0x41, 0x00, 0, 0, 0, 1]);

        // Chunk smaller than the first frame: the terminating start code is
        // never seen, so the stream ends early. Known one-pass limitation.
        let mut reader = FrameReader::with_chunk_size(Cursor::new(data), 32);
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn four_byte_code_found_from_first_zero() {
        // The scan must report the 4-byte code at its first zero byte so the
        // frame excludes the whole code.
        let data = vec![0, 0, 1, 0x41, 0xaa, 0, 0, 0, 1, 0x41, 0xbb, 0, 0, 1];
        let mut reader = FrameReader::new(Cursor::new(data));
        let f1 = reader.next_frame().unwrap().unwrap();
        assert_eq!(f1.nal(), &[0x41, 0xaa]);
        let f2 = reader.next_frame().unwrap().unwrap();
        assert_eq!(f2.start_code_len(), 4);
        assert_eq!(f2.nal(), &[0x41, 0xbb]);
    }
}
