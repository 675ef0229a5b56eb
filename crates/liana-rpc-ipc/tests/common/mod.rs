//! Minimal stand-in for lianad used by the socket tests.
//!
//! The daemon binds a real Unix socket, records every request line it gets,
//! and answers according to a handler closure.

#![allow(dead_code)]

use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::os::unix::net::UnixListener;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;

/// How the mock answers one request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A single newline-terminated JSON line.
    Json(Value),
    /// Raw chunks written one by one with a pause in between.
    Chunks(Vec<Vec<u8>>, Duration),
    /// Hang up without answering.
    Close,
}

type Handler = dyn Fn(&Value) -> Reply + Send + Sync;

pub struct MockDaemon {
    _temp_dir: TempDir,
    socket_path: PathBuf,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockDaemon {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Value) -> Reply + Send + Sync + 'static,
    {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let socket_path = temp_dir.path().join("lianad_rpc");
        Self::start_at(temp_dir, socket_path, handler)
    }

    /// Binds under a directory chain long enough to overflow `sun_path`.
    pub fn start_with_long_path<F>(handler: F) -> Self
    where
        F: Fn(&Value) -> Reply + Send + Sync + 'static,
    {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let dir = temp_dir
            .path()
            .join("a".repeat(60))
            .join("b".repeat(60));
        std::fs::create_dir_all(&dir).expect("Failed to create long dir");
        let socket_path = dir.join("lianad_rpc");
        Self::start_at(temp_dir, socket_path, handler)
    }

    fn start_at<F>(temp_dir: TempDir, socket_path: PathBuf, handler: F) -> Self
    where
        F: Fn(&Value) -> Reply + Send + Sync + 'static,
    {
        let listener = bind_listener(&socket_path);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let recorded = Arc::clone(&requests);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let recorded = Arc::clone(&recorded);
                let handler = Arc::clone(&handler);
                std::thread::spawn(move || serve(stream, &recorded, handler.as_ref()));
            }
        });

        Self {
            _temp_dir: temp_dir,
            socket_path,
            requests,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().expect("requests lock").clone()
    }
}

fn serve(stream: UnixStream, recorded: &Mutex<Vec<Value>>, handler: &Handler) {
    let mut writer = stream.try_clone().expect("clone stream");
    let mut reader = BufReader::new(stream);
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let request: Value = serde_json::from_str(line.trim_end()).unwrap_or(Value::Null);
        recorded.lock().expect("requests lock").push(request.clone());

        match handler(&request) {
            Reply::Json(value) => {
                let _ = writeln!(writer, "{value}");
            }
            Reply::Chunks(chunks, pause) => {
                for chunk in chunks {
                    let _ = writer.write_all(&chunk);
                    let _ = writer.flush();
                    std::thread::sleep(pause);
                }
            }
            Reply::Close => return,
        }
    }
}

/// Binds `path`, going through `/proc/self/fd` when the path is too long.
fn bind_listener(path: &Path) -> UnixListener {
    match UnixListener::bind(path) {
        Ok(listener) => listener,
        Err(err) => bind_via_alias(path).unwrap_or_else(|| panic!("bind {}: {err}", path.display())),
    }
}

#[cfg(target_os = "linux")]
fn bind_via_alias(path: &Path) -> Option<UnixListener> {
    use std::os::fd::AsRawFd;

    let dir = std::fs::File::open(path.parent()?).ok()?;
    let alias = Path::new("/proc/self/fd")
        .join(dir.as_raw_fd().to_string())
        .join(path.file_name()?);
    UnixListener::bind(alias).ok()
}

#[cfg(not(target_os = "linux"))]
fn bind_via_alias(_path: &Path) -> Option<UnixListener> {
    None
}
