pub mod error;
pub mod media;
pub mod protocol;
pub mod server;
pub mod session;
pub mod stream;
pub mod transport;

pub use error::{Result, RtspError};
pub use media::h264::H264Packetizer;
pub use server::{Server, ServerConfig, Viewer};
