/// An RTSP response (RFC 2326 §7).
///
/// Serializes to the standard text format:
///
/// ```text
/// RTSP/1.0 200 OK\r\n
/// CSeq: 2\r\n
/// Content-Type: application/sdp\r\n
/// Content-Length: 142\r\n
/// \r\n
/// v=0\r\n...
/// ```
///
/// Built with a chained builder — [`add_header`](Self::add_header) and
/// [`with_body`](Self::with_body) — then serialized. `Content-Length` is
/// computed from the body so it always matches exactly (RFC 2326 §12.14).
#[must_use]
pub struct RtspResponse {
    pub status_code: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Server identification string included in every response (RFC 2326 §12.36).
pub const SERVER_AGENT: &str = "rtsp-vod/0.1";

impl RtspResponse {
    pub fn new(status_code: u16, status_text: &str) -> Self {
        RtspResponse {
            status_code,
            status_text: status_text.to_string(),
            headers: vec![("Server".to_string(), SERVER_AGENT.to_string())],
            body: None,
        }
    }

    /// 200 OK (RFC 2326 §7.1.1).
    pub fn ok() -> Self {
        Self::new(200, "OK")
    }

    /// 400 Bad Request — malformed request or missing required header.
    pub fn bad_request() -> Self {
        Self::new(400, "Bad Request")
    }

    /// 404 Not Found — the requested resource does not exist.
    pub fn not_found() -> Self {
        Self::new(404, "Not Found")
    }

    /// 501 Not Implemented — method outside the supported set.
    pub fn not_implemented() -> Self {
        Self::new(501, "Not Implemented")
    }

    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize to the RTSP text wire format.
    pub fn serialize(&self) -> String {
        let mut response = format!("RTSP/1.0 {} {}\r\n", self.status_code, self.status_text);

        for (name, value) in &self.headers {
            response.push_str(&format!("{}: {}\r\n", name, value));
        }

        if let Some(body) = &self.body {
            response.push_str(&format!("Content-Length: {}\r\n", body.len()));
            response.push_str("\r\n");
            response.push_str(body);
        } else {
            response.push_str("\r\n");
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_no_body() {
        let resp = RtspResponse::ok()
            .add_header("CSeq", "1")
            .add_header("Public", "OPTIONS, DESCRIBE, SETUP, PLAY");
        let s = resp.serialize();
        assert!(s.starts_with("RTSP/1.0 200 OK\r\n"));
        assert!(s.contains("Server: rtsp-vod/0.1\r\n"));
        assert!(s.contains("CSeq: 1\r\n"));
        assert!(s.contains("Public: OPTIONS, DESCRIBE, SETUP, PLAY\r\n"));
        assert!(s.ends_with("\r\n\r\n"));
    }

    #[test]
    fn content_length_matches_body_bytes() {
        let body = "v=0\r\no=- 0 1 IN IP4 10.0.0.1\r\n".to_string();
        let resp = RtspResponse::ok()
            .add_header("CSeq", "2")
            .with_body(body.clone());
        let s = resp.serialize();
        assert!(s.contains(&format!("Content-Length: {}\r\n", body.len())));
        assert!(s.ends_with(&body));
    }

    #[test]
    fn error_statuses() {
        assert!(
            RtspResponse::bad_request()
                .serialize()
                .starts_with("RTSP/1.0 400 Bad Request\r\n")
        );
        assert!(
            RtspResponse::not_implemented()
                .serialize()
                .starts_with("RTSP/1.0 501 Not Implemented\r\n")
        );
        assert!(
            RtspResponse::not_found()
                .serialize()
                .starts_with("RTSP/1.0 404 Not Found\r\n")
        );
    }
}
