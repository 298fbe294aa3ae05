//! Framed manifest codec.
//!
//! # Wire format
//!
//! ```text
//! ┌────────────┬──────────────┬──────────────────┬─────────────────────────┐
//! │ magic (4)  │ version (2)  │ payload len (4)  │ payload (bincode)       │
//! │ "FWMF"     │ u16 BE       │ u32 BE           │ ServerFiles             │
//! └────────────┴──────────────┴──────────────────┴─────────────────────────┘
//! ```
//!
//! The client handshake that precedes the frame is the raw identity string,
//! with no framing and no acknowledgement.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::ProtocolError;

/// Frame magic identifying the manifest protocol.
pub const MANIFEST_MAGIC: [u8; 4] = *b"FWMF";

/// Protocol revision understood by this client.
pub const PROTOCOL_VERSION: u16 = 1;

/// Largest payload accepted (16 MiB).
pub const MAX_PAYLOAD_LEN: u32 = 16 * 1024 * 1024;

const HEADER_LEN: usize = 10;

/// File list served by the inventory server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFiles {
    /// Root directory the files live under on the server.
    pub server_path: String,
    /// Absolute remote paths, in server order.
    pub files: Vec<String>,
}

/// Encode a manifest into a complete frame.
pub fn encode_frame(files: &ServerFiles) -> Result<Vec<u8>, ProtocolError> {
    let payload = bincode::serialize(files).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_PAYLOAD_LEN)
        .ok_or(ProtocolError::FrameTooLarge {
            len: u32::try_from(payload.len()).unwrap_or(u32::MAX),
            max: MAX_PAYLOAD_LEN,
        })?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&MANIFEST_MAGIC);
    frame.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Write one manifest frame to `writer`.
pub async fn write_manifest<W>(writer: &mut W, files: &ServerFiles) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(files)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one manifest frame from `reader`.
///
/// The header is validated before the payload is read, so a peer speaking
/// another protocol is rejected without draining its stream.
pub async fn read_manifest<R>(reader: &mut R) -> Result<ServerFiles, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;

    let mut magic = [0u8; 4];
    magic.copy_from_slice(&header[0..4]);
    if magic != MANIFEST_MAGIC {
        return Err(ProtocolError::WrongProtocol {
            expected: MANIFEST_MAGIC,
            found: magic,
        });
    }

    let version = u16::from_be_bytes([header[4], header[5]]);
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion {
            found: version,
            supported: PROTOCOL_VERSION,
        });
    }

    let len = u32::from_be_bytes([header[6], header[7], header[8], header[9]]);
    if len > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;

    bincode::deserialize(&payload).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ServerFiles {
        ServerFiles {
            server_path: "/srv/data".to_string(),
            files: vec![
                "/srv/data/a.txt".to_string(),
                "/srv/data/sub/b.txt".to_string(),
            ],
        }
    }

    #[tokio::test]
    async fn test_read_written_manifest() {
        let frame = encode_frame(&sample()).unwrap();
        let decoded = read_manifest(&mut frame.as_slice()).await.unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_frame_header_layout() {
        let frame = encode_frame(&sample()).unwrap();
        assert_eq!(&frame[0..4], b"FWMF");
        assert_eq!(u16::from_be_bytes([frame[4], frame[5]]), 1);
        let len = u32::from_be_bytes([frame[6], frame[7], frame[8], frame[9]]);
        assert_eq!(len as usize, frame.len() - HEADER_LEN);
    }

    #[tokio::test]
    async fn test_wrong_magic_is_wrong_protocol() {
        let mut input: &[u8] = b"HTTP/1.1 400 Bad Request\r\n";
        let err = read_manifest(&mut input).await.unwrap_err();
        assert!(matches!(err, ProtocolError::WrongProtocol { found, .. } if &found == b"HTTP"));
    }

    #[tokio::test]
    async fn test_other_version_is_rejected() {
        let mut frame = encode_frame(&sample()).unwrap();
        frame[4..6].copy_from_slice(&2u16.to_be_bytes());
        let err = read_manifest(&mut frame.as_slice()).await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnsupportedVersion { found: 2, supported: 1 }
        ));
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let mut frame = encode_frame(&sample()).unwrap();
        frame[6..10].copy_from_slice(&(MAX_PAYLOAD_LEN + 1).to_be_bytes());
        let err = read_manifest(&mut frame.as_slice()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_truncated_frame_is_transient() {
        let frame = encode_frame(&sample()).unwrap();
        let mut truncated = &frame[..frame.len() - 3];
        let err = read_manifest(&mut truncated).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_garbage_payload_is_malformed() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&MANIFEST_MAGIC);
        frame.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        frame.extend_from_slice(&4u32.to_be_bytes());
        frame.extend_from_slice(&[0xff, 0xff, 0xff, 0xff]);

        let err = read_manifest(&mut frame.as_slice()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
        assert!(!err.is_transient());
    }
}
