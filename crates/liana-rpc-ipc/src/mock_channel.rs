use std::collections::VecDeque;

use serde_json::Value;

use crate::channel::ByteChannel;
use crate::error::ClientError;

/// An in-memory [`ByteChannel`] that replays scripted chunks.
///
/// Each `receive` hands out at most one scripted chunk, split to the
/// requested size when it is larger. Once the script is exhausted it behaves
/// like a peer that closed the connection. Everything sent is recorded.
///
/// # Example
///
/// ```
/// use liana_rpc_ipc::{Params, RpcSession, ScriptedChannel, SessionConfig};
/// use serde_json::json;
///
/// let channel = ScriptedChannel::new().with_response(&json!({"result": {"block_height": 100}}));
/// let mut session = RpcSession::new(channel, SessionConfig::default());
///
/// let outcome = session.call("getinfo", Params::empty()).unwrap();
/// assert_eq!(outcome.success(), Some(json!({"block_height": 100})));
/// ```
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    chunks: VecDeque<Vec<u8>>,
    sent: Vec<u8>,
    requested: Vec<usize>,
    closed: bool,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk(mut self, chunk: Vec<u8>) -> Self {
        self.chunks.push_back(chunk);
        self
    }

    /// Scripts `bytes` split into pieces of `size` bytes.
    pub fn with_bytes_in_chunks(mut self, bytes: &[u8], size: usize) -> Self {
        for piece in bytes.chunks(size.max(1)) {
            self.chunks.push_back(piece.to_vec());
        }
        self
    }

    /// Scripts one newline-terminated JSON response.
    pub fn with_response(self, response: &Value) -> Self {
        let mut line = response.to_string().into_bytes();
        line.push(b'\n');
        self.with_chunk(line)
    }

    /// Raw bytes written through the channel.
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Written bytes decoded as newline-separated JSON requests.
    pub fn sent_requests(&self) -> Vec<Value> {
        self.sent
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .filter_map(|line| serde_json::from_slice(line).ok())
            .collect()
    }

    /// The `max_bytes` of every `receive` call, in order.
    pub fn requested_sizes(&self) -> &[usize] {
        &self.requested
    }
}

impl ByteChannel for ScriptedChannel {
    fn send(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::NotConnected);
        }
        self.sent.extend_from_slice(bytes);
        Ok(())
    }

    fn receive(&mut self, max_bytes: usize) -> Result<Vec<u8>, ClientError> {
        if self.closed {
            return Err(ClientError::NotConnected);
        }
        self.requested.push(max_bytes);
        let Some(mut chunk) = self.chunks.pop_front() else {
            return Ok(Vec::new());
        };
        if chunk.len() > max_bytes {
            let rest = chunk.split_off(max_bytes);
            self.chunks.push_front(rest);
        }
        Ok(chunk)
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_open(&self) -> bool {
        !self.closed
    }
}
