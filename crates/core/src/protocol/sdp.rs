//! SDP session description generation (RFC 4566).
//!
//! Produces the body of DESCRIBE responses — a single H.264 video track on
//! RTP payload type 96 at the 90 kHz clock:
//!
//! ```text
//! v=0                                  ← protocol version
//! o=- <sess-id> 1 IN IP4 <addr>        ← origin
//! s=<session-name>                      ← session name
//! c=IN IP4 <addr>                       ← connection address
//! t=0 0                                 ← timing (unbounded)
//! a=control:*                           ← aggregate control URL
//! a=sendonly                            ← direction
//! m=video 0 RTP/AVP 96                  ← media description
//! a=rtpmap:96 H264/90000                ← codec / clock rate
//! a=fmtp:96 packetization-mode=1[;...]  ← codec parameters (RFC 6184 §8.1)
//! a=control:track0                      ← track control URL for SETUP
//! ```
//!
//! When SPS/PPS were probed from the media file, the `a=fmtp` line also
//! carries `profile-level-id` and `sprop-parameter-sets` so players can
//! initialize their decoder before the first keyframe arrives.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::media::h264::ParameterSets;
use crate::media::rtp::PAYLOAD_TYPE_H264;

/// Generate the SDP body for the served stream.
///
/// `host` is the address advertised in the `o=` and `c=` lines, taken from
/// the request URI. Attribute order matters: `a=rtpmap` must precede the
/// `a=fmtp` line that references it (RFC 6184 §8.2.1).
pub fn generate_sdp(host: &str, session_name: &str, params: Option<&ParameterSets>) -> String {
    let session_id = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut fmtp = format!("a=fmtp:{} packetization-mode=1", PAYLOAD_TYPE_H264);
    if let Some(params) = params {
        if let Some(id) = params.profile_level_id() {
            fmtp.push_str(&format!(";profile-level-id={}", id));
        }
        fmtp.push_str(&format!(
            ";sprop-parameter-sets={}",
            params.sprop_parameter_sets()
        ));
    }

    let lines = [
        "v=0".to_string(),
        format!("o=- {} 1 IN IP4 {}", session_id, host),
        format!("s={}", session_name),
        format!("c=IN IP4 {}", host),
        "t=0 0".to_string(),
        "a=control:*".to_string(),
        "a=sendonly".to_string(),
        format!("m=video 0 RTP/AVP {}", PAYLOAD_TYPE_H264),
        format!("a=rtpmap:{} H264/90000", PAYLOAD_TYPE_H264),
        fmtp,
        "a=control:track0".to_string(),
    ];

    tracing::debug!("SDP: {}", lines.join("\r\n"));

    format!("{}\r\n", lines.join("\r\n"))
}
