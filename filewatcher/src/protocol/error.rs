//! Manifest protocol errors.

use std::io;

use thiserror::Error;

/// Errors raised while exchanging a manifest with the server.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The stream failed or closed mid-frame.
    #[error("stream error: {0}")]
    Io(#[from] io::Error),

    /// The peer does not speak the manifest protocol.
    #[error("wrong protocol: expected magic {expected:?}, got {found:?}")]
    WrongProtocol { expected: [u8; 4], found: [u8; 4] },

    /// The peer speaks a different revision of the protocol.
    #[error("unsupported protocol version {found} (supported: {supported})")]
    UnsupportedVersion { found: u16, supported: u16 },

    /// The announced payload exceeds the frame limit.
    #[error("frame too large: {len} bytes (max: {max})")]
    FrameTooLarge { len: u32, max: u32 },

    /// The payload could not be decoded.
    #[error("malformed manifest: {0}")]
    Malformed(String),
}

impl ProtocolError {
    /// Whether the failure is a stream fault worth retrying.
    ///
    /// Everything else means the server answered with something that is not
    /// a manifest; retrying the decode on the same stream cannot help.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
