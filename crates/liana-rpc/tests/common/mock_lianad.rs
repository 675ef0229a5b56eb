//! Mock lianad for CLI tests.
//!
//! Listens on a Unix socket in a temporary directory and answers each
//! JSON-RPC request line with the response configured for its method.
//! Unconfigured methods get a "method not found" error. Every request is
//! recorded.

#![allow(dead_code)]

use std::collections::HashMap;
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
use serde_json::json;
use tempfile::TempDir;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub id: Value,
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(Value),
    Error { code: i64, message: String },
    /// Written verbatim, newline appended.
    Raw(String),
    /// Answer with a different id.
    WrongId(Value),
    /// Close the connection without answering.
    Disconnect,
    /// Stay silent for the given time.
    Delay(Duration),
}

type Responses = Arc<Mutex<HashMap<String, MockResponse>>>;

pub struct MockLianad {
    _temp_dir: TempDir,
    socket_path: PathBuf,
    responses: Responses,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockLianad {
    pub fn start() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let socket_path = temp_dir.path().join("lianad_rpc");
        let listener = UnixListener::bind(&socket_path).expect("Failed to bind mock socket");

        let responses: Responses = Arc::new(Mutex::new(HashMap::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let (responses_ref, requests_ref) = (Arc::clone(&responses), Arc::clone(&requests));
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let responses = Arc::clone(&responses_ref);
                let requests = Arc::clone(&requests_ref);
                std::thread::spawn(move || serve(stream, &responses, &requests));
            }
        });

        Self {
            _temp_dir: temp_dir,
            socket_path,
            responses,
            requests,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn set_response(&self, method: &str, response: MockResponse) {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(method.to_string(), response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn last_request_for(&self, method: &str) -> Option<RecordedRequest> {
        self.requests()
            .into_iter()
            .rev()
            .find(|request| request.method == method)
    }
}

fn serve(stream: UnixStream, responses: &Responses, requests: &Mutex<Vec<RecordedRequest>>) {
    let mut writer = stream.try_clone().expect("clone stream");
    let mut reader = BufReader::new(stream);
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let request: Value = serde_json::from_str(line.trim_end()).unwrap_or(Value::Null);
        let method = request["method"].as_str().unwrap_or_default().to_string();
        let id = request["id"].clone();
        requests.lock().expect("requests lock").push(RecordedRequest {
            id: id.clone(),
            method: method.clone(),
            params: request["params"].clone(),
        });

        let response = responses
            .lock()
            .expect("responses lock")
            .get(&method)
            .cloned()
            .unwrap_or_else(|| MockResponse::Error {
                code: -32601,
                message: format!("Unknown method '{method}'"),
            });

        let body = match response {
            MockResponse::Success(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string(),
            MockResponse::Error { code, message } => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": code, "message": message}
            })
            .to_string(),
            MockResponse::Raw(raw) => raw,
            MockResponse::WrongId(other) => {
                json!({"jsonrpc": "2.0", "id": other, "result": {}}).to_string()
            }
            MockResponse::Disconnect => return,
            MockResponse::Delay(pause) => {
                std::thread::sleep(pause);
                return;
            }
        };
        if writeln!(writer, "{body}").is_err() {
            return;
        }
    }
}
