use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::Conn;

/// Unix domain socket listener for the collector side of a pipeline.
///
/// Binds a filesystem-path socket, accepts sender connections as [`Conn`]
/// streams, and removes the socket file on drop, but only while it is
/// still the file this listener created.
#[derive(Debug)]
pub struct UnixSocketListener {
    listener: UnixListener,
    path: PathBuf,
    /// `(dev, ino)` of the socket file created at bind time; drop-time
    /// cleanup is skipped if the path no longer has this identity.
    created_inode: Option<(u64, u64)>,
}

impl UnixSocketListener {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on a filesystem-path Unix domain socket.
    ///
    /// If the path already exists and is a socket, it is removed first
    /// (stale socket cleanup). A non-socket file at the path is never
    /// removed. The created socket file is restricted to
    /// [`DEFAULT_SOCKET_MODE`](Self::DEFAULT_SOCKET_MODE).
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_SOCKET_MODE)
    }

    /// Bind and listen on a filesystem-path Unix domain socket with an
    /// explicit permission mode.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(|e| TransportError::Bind {
                path: path.clone(),
                source: e,
            })?;
            if metadata.file_type().is_socket() {
                debug!(path = %path.display(), "removing stale socket");
                std::fs::remove_file(&path).map_err(|e| TransportError::Bind {
                    path: path.clone(),
                    source: e,
                })?;
            } else {
                return Err(TransportError::Bind {
                    path: path.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                });
            }
        }

        let listener = UnixListener::bind(&path).map_err(|e| TransportError::Bind {
            path: path.clone(),
            source: e,
        })?;

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
            TransportError::Bind {
                path: path.clone(),
                source: e,
            }
        })?;

        let created_metadata =
            std::fs::symlink_metadata(&path).map_err(|e| TransportError::Bind {
                path: path.clone(),
                source: e,
            })?;
        let created_inode = Some((created_metadata.dev(), created_metadata.ino()));

        info!(path = %path.display(), "listening on unix domain socket");

        Ok(Self {
            listener,
            path,
            created_inode,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<Conn> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!("accepted connection");
        Ok(Conn::from(stream))
    }

    /// The filesystem path this listener is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UnixSocketListener {
    fn drop(&mut self) {
        if let Some((expected_dev, expected_ino)) = self.created_inode {
            if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
                if metadata.file_type().is_socket()
                    && metadata.dev() == expected_dev
                    && metadata.ino() == expected_ino
                {
                    debug!(path = %self.path.display(), "cleaning up socket file");
                    let _ = std::fs::remove_file(&self.path);
                } else {
                    debug!(
                        path = %self.path.display(),
                        "socket path identity changed; skipping cleanup"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;

    #[test]
    fn bind_accept_connect_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("fstrm.sock");
        let listener = UnixSocketListener::bind(&sock).unwrap();

        let path = sock.clone();
        let client = std::thread::spawn(move || {
            let mut conn = Conn::connect_unix(&path).unwrap();
            conn.write_all(b"hello").unwrap();
        });

        let mut server = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        client.join().unwrap();
    }

    #[test]
    fn bind_default_permissions_hardened() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("perm.sock");
        let _listener = UnixSocketListener::bind(&sock).unwrap();

        let mode = std::fs::metadata(&sock).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn stale_socket_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("stale.sock");

        let first = UnixSocketListener::bind(&sock).unwrap();
        std::mem::forget(first); // simulate a crashed process leaving the file

        let second = UnixSocketListener::bind(&sock);
        assert!(second.is_ok());
    }

    #[test]
    fn refuses_to_remove_non_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-socket");
        std::fs::write(&path, b"data").unwrap();

        let err = UnixSocketListener::bind(&path).unwrap_err();
        assert!(matches!(err, TransportError::Bind { .. }));
        assert!(path.exists());
    }

    #[test]
    fn rejects_overlong_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x".repeat(200));
        let err = UnixSocketListener::bind(&path).unwrap_err();
        assert!(matches!(err, TransportError::PathTooLong { .. }));
    }

    #[test]
    fn socket_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("drop.sock");
        {
            let _listener = UnixSocketListener::bind(&sock).unwrap();
            assert!(sock.exists());
        }
        assert!(!sock.exists());
    }

    #[test]
    fn drop_does_not_remove_replaced_path() {
        let dir = tempfile::tempdir().unwrap();
        let sock = dir.path().join("replaced.sock");
        let listener = UnixSocketListener::bind(&sock).unwrap();
        assert!(sock.exists());

        // Replace the path while the listener is alive.
        std::fs::remove_file(&sock).unwrap();
        std::fs::write(&sock, b"replacement-file").unwrap();

        drop(listener);
        assert!(
            sock.exists(),
            "drop must not remove path if inode identity changed"
        );
    }
}
