//! Byte-level transport over a single Unix domain socket.

use std::io;
use std::io::Read;
use std::io::Write;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::ClientError;

/// Raw byte transport underneath an [`RpcSession`](crate::RpcSession).
pub trait ByteChannel {
    /// Writes the whole buffer.
    fn send(&mut self, bytes: &[u8]) -> Result<(), ClientError>;

    /// Reads at most `max_bytes`. A shorter result means the peer has nothing
    /// more to hand over right now; an empty one means it closed the stream.
    fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>, ClientError>;

    /// Releases the connection. Calling it again is a no-op.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

pub struct UnixSocketChannel {
    path: PathBuf,
    stream: Option<UnixStream>,
}

impl UnixSocketChannel {
    /// Connects to the socket at `path` and applies `timeout` to both reads
    /// and writes.
    ///
    /// On Linux a path too long for `sockaddr_un` is reached through a
    /// `/proc/self/fd/<dirfd>/<name>` alias of its parent directory.
    pub fn connect(path: impl AsRef<Path>, timeout: Duration) -> Result<Self, ClientError> {
        let path = path.as_ref();
        debug!(socket = %path.display(), "Connecting to daemon socket");

        let stream = match UnixStream::connect(path) {
            Ok(stream) => stream,
            Err(err) if is_path_too_long(path, &err) => connect_via_alias(path, err)?,
            Err(source) => {
                return Err(ClientError::ConnectionFailed {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        Ok(Self {
            path: path.to_path_buf(),
            stream: Some(stream),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteChannel for UnixSocketChannel {
    fn send(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        stream.write_all(bytes)?;
        stream.flush()?;
        Ok(())
    }

    fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>, ClientError> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        let mut buf = vec![0u8; max_bytes];
        let read = loop {
            match stream.read(&mut buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        };
        buf.truncate(read);
        Ok(buf)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            // The peer may already be gone; the fd is released on drop either way.
            let _ = stream.shutdown(Shutdown::Both);
            debug!(socket = %self.path.display(), "Closed daemon socket");
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for UnixSocketChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Capacity of `sockaddr_un.sun_path`, including the trailing NUL.
pub(crate) fn sun_path_capacity() -> usize {
    // SAFETY: sockaddr_un is a plain C struct for which all-zero bytes is a valid value.
    let addr: libc::sockaddr_un = unsafe { std::mem::zeroed() };
    addr.sun_path.len()
}

fn is_path_too_long(path: &Path, err: &io::Error) -> bool {
    if err.raw_os_error() == Some(libc::ENAMETOOLONG) {
        return true;
    }
    err.kind() == io::ErrorKind::InvalidInput && path.as_os_str().len() >= sun_path_capacity()
}

#[cfg(target_os = "linux")]
fn connect_via_alias(path: &Path, original: io::Error) -> Result<UnixStream, ClientError> {
    use std::os::fd::AsRawFd;

    let (Some(parent), Some(file_name)) = (path.parent(), path.file_name()) else {
        return Err(ClientError::ConnectionFailed {
            path: path.to_path_buf(),
            source: original,
        });
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };

    let dir = open_directory(parent).map_err(|source| ClientError::ConnectionFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let alias = Path::new("/proc/self/fd")
        .join(dir.as_raw_fd().to_string())
        .join(file_name);
    debug!(
        socket = %path.display(),
        alias = %alias.display(),
        "Socket path too long, retrying through directory alias"
    );

    // `dir` only has to outlive the connect call.
    UnixStream::connect(&alias).map_err(|source| ClientError::ConnectionFailed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(not(target_os = "linux"))]
fn connect_via_alias(path: &Path, original: io::Error) -> Result<UnixStream, ClientError> {
    Err(ClientError::ConnectionFailed {
        path: path.to_path_buf(),
        source: original,
    })
}

#[cfg(target_os = "linux")]
fn open_directory(dir: &Path) -> io::Result<std::os::fd::OwnedFd> {
    use std::ffi::CString;
    use std::os::fd::FromRawFd;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(dir.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains a NUL byte"))?;
    // SAFETY: c_path is a valid NUL-terminated string that outlives the call.
    let fd = unsafe {
        libc::open(
            c_path.as_ptr(),
            libc::O_DIRECTORY | libc::O_RDONLY | libc::O_CLOEXEC,
        )
    };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: fd was just returned by open(2) and nothing else owns it.
    Ok(unsafe { std::os::fd::OwnedFd::from_raw_fd(fd) })
}
