//! Remote path model and local directory preparation.
//!
//! The server reports absolute paths together with the root they live under.
//! [`FilePath`] projects a remote path onto that root so it can be mirrored
//! below the local downloads directory.

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

/// A remote file path, with its projection relative to the server root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePath {
    /// Absolute path on the server.
    pub absolute: PathBuf,
    /// Path relative to the server root.
    ///
    /// Equal to `absolute` when the root is not a prefix of it.
    pub relative: PathBuf,
}

impl FilePath {
    /// Project `absolute` onto `server_root`.
    pub fn new(absolute: impl Into<PathBuf>, server_root: impl AsRef<Path>) -> Self {
        let absolute = absolute.into();
        let relative = absolute
            .strip_prefix(server_root.as_ref())
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| absolute.clone());

        Self { absolute, relative }
    }

    /// The final component of the remote path, as the transfer tool echoes it.
    pub fn file_name(&self) -> Option<String> {
        file_name(&self.absolute)
    }

    /// Where this file lands below `destination_root`.
    ///
    /// Root and prefix components of the relative path are dropped so the
    /// result never escapes the destination root, even when the relative path
    /// fell back to the absolute one.
    pub fn local_path(&self, destination_root: &Path) -> PathBuf {
        let mut local = destination_root.to_path_buf();
        for component in self.relative.components() {
            match component {
                Component::Normal(part) => local.push(part),
                Component::ParentDir => {
                    if local != destination_root {
                        local.pop();
                    }
                }
                Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            }
        }
        local
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.absolute.display())
    }
}

/// Extract the filename from a path.
pub fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Remove trailing separators from a configured directory path.
///
/// The filesystem root is returned unchanged.
pub fn remove_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Errors raised while preparing local directories.
#[derive(Debug)]
pub enum PathError {
    /// The path, or one of its ancestors, is an existing plain file.
    NotADirectory { path: PathBuf },

    /// The path has no parent directory to create.
    NoParent { path: PathBuf },

    /// Creating the directory failed for another reason.
    CreateDirFailed { path: PathBuf, source: io::Error },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotADirectory { path } => {
                write!(f, "the path '{}' is an existing file", path.display())
            }
            Self::NoParent { path } => {
                write!(f, "the path '{}' has no parent directory", path.display())
            }
            Self::CreateDirFailed { path, source } => {
                write!(f, "the path '{}' is invalid: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for PathError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateDirFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Create `dir` and all of its ancestors.
///
/// Existing directories are not an error, so concurrent callers racing on a
/// shared parent both succeed.
pub async fn create_directory(dir: &Path) -> Result<(), PathError> {
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) => {
            // create_dir_all reports a file in the way as AlreadyExists or
            // NotADirectory depending on where in the chain it sits.
            if collides_with_file(dir).await {
                Err(PathError::NotADirectory {
                    path: dir.to_path_buf(),
                })
            } else {
                Err(PathError::CreateDirFailed {
                    path: dir.to_path_buf(),
                    source: e,
                })
            }
        }
    }
}

/// Create every parent directory of the file at `file_path`.
pub async fn create_parent_directories(file_path: &Path) -> Result<(), PathError> {
    let parent = file_path.parent().ok_or_else(|| PathError::NoParent {
        path: file_path.to_path_buf(),
    })?;
    create_directory(parent).await
}

async fn collides_with_file(dir: &Path) -> bool {
    for ancestor in dir.ancestors() {
        if let Ok(meta) = tokio::fs::metadata(ancestor).await {
            return !meta.is_dir();
        }
    }
    false
}
