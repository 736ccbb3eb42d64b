//! RTSP protocol implementation (RFC 2326).
//!
//! Text-based request/response signaling over the control TCP connection:
//! parsing requests, building responses, routing methods, generating SDP.
//!
//! ## Supported methods
//!
//! | Method | RFC section | Purpose |
//! |--------|-------------|---------|
//! | OPTIONS | §10.1 | Capability discovery |
//! | DESCRIBE | §10.2 | Retrieve SDP session description |
//! | SETUP | §10.4 | Negotiate transport (UDP ports) |
//! | PLAY | §10.5 | Start media delivery (terminal) |
//!
//! Anything else receives `501 Not Implemented`; a request that fails to
//! parse receives `400 Bad Request` rather than being dropped silently.

pub mod handler;
pub mod request;
pub mod response;
pub mod sdp;

pub use handler::{Action, MethodHandler};
pub use request::RtspRequest;
pub use response::RtspResponse;
