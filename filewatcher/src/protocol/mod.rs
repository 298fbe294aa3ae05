//! Manifest protocol spoken with the filewatched inventory server.
//!
//! The exchange is a single round trip:
//!
//! 1. Client sends its raw identity string (e.g. `"filewatcher"`).
//! 2. Server replies with one framed [`ServerFiles`] (see [`codec`]).
//!
//! Decode failures are split into stream faults, which the connection
//! supervisor retries, and protocol faults, which abandon the attempt. See
//! [`ProtocolError::is_transient`].

pub mod codec;
mod error;

use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

pub use codec::{read_manifest, write_manifest, ServerFiles, MANIFEST_MAGIC, PROTOCOL_VERSION};
pub use error::ProtocolError;

use crate::path::FilePath;

/// Identity string sent by default as the handshake.
pub const DEFAULT_CLIENT_ID: &str = "filewatcher";

/// One remote file to pull.
pub type ManifestEntry = FilePath;

/// A decoded manifest, projected onto the server root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Root directory reported by the server.
    pub server_path: PathBuf,
    /// Files in server order.
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Number of files listed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the server listed no files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<ServerFiles> for Manifest {
    fn from(files: ServerFiles) -> Self {
        let server_path = PathBuf::from(&files.server_path);
        let entries = files
            .files
            .into_iter()
            .map(|remote| FilePath::new(remote, &server_path))
            .collect();

        Self {
            server_path,
            entries,
        }
    }
}

/// Send the raw identity handshake.
pub async fn send_identity<W>(writer: &mut W, client_id: &str) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(client_id.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Perform the handshake and read the manifest that answers it.
pub async fn fetch_manifest<S>(stream: &mut S, client_id: &str) -> Result<Manifest, ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send_identity(stream, client_id).await?;
    let files = read_manifest(stream).await?;
    Ok(Manifest::from(files))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_projects_entries() {
        let manifest = Manifest::from(ServerFiles {
            server_path: "/srv/data".to_string(),
            files: vec![
                "/srv/data/a.txt".to_string(),
                "/srv/data/sub/b.txt".to_string(),
            ],
        });

        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.entries[0].relative, PathBuf::from("a.txt"));
        assert_eq!(manifest.entries[1].relative, PathBuf::from("sub/b.txt"));
        assert_eq!(
            manifest.entries[1].absolute,
            PathBuf::from("/srv/data/sub/b.txt")
        );
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::from(ServerFiles {
            server_path: "/srv/data".to_string(),
            files: vec![],
        });
        assert!(manifest.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_manifest_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        let server_task = tokio::spawn(async move {
            let mut id = vec![0u8; DEFAULT_CLIENT_ID.len()];
            tokio::io::AsyncReadExt::read_exact(&mut server, &mut id)
                .await
                .unwrap();
            let files = ServerFiles {
                server_path: "/srv".to_string(),
                files: vec!["/srv/x.bin".to_string()],
            };
            write_manifest(&mut server, &files).await.unwrap();
            id
        });

        let manifest = fetch_manifest(&mut client, DEFAULT_CLIENT_ID)
            .await
            .unwrap();
        let id = server_task.await.unwrap();

        assert_eq!(id, b"filewatcher");
        assert_eq!(manifest.entries[0].relative, PathBuf::from("x.bin"));
    }
}
