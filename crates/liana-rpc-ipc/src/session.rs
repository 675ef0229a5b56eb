//! JSON-RPC request/response exchange on top of a [`ByteChannel`].

use std::path::Path;

use serde_json::Value;
use tracing::debug;
use tracing::dispatcher;

use crate::channel::ByteChannel;
use crate::channel::UnixSocketChannel;
use crate::config::SessionConfig;
use crate::error::ClientError;
use crate::error::ProtocolError;
use crate::types::Params;
use crate::types::RemoteError;
use crate::types::RpcOutcome;
use crate::types::RpcRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Closed,
}

/// One connection to the daemon, one request in flight at a time.
///
/// `call` takes `&mut self`, so sharing a session between threads needs an
/// external lock. Dropping the session closes the connection; a closed
/// session cannot be reopened.
pub struct RpcSession<C: ByteChannel = UnixSocketChannel> {
    channel: C,
    config: SessionConfig,
    state: SessionState,
    next_id: u64,
}

impl RpcSession<UnixSocketChannel> {
    pub fn connect(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        Self::connect_with(path, SessionConfig::default())
    }

    pub fn connect_with(path: impl AsRef<Path>, config: SessionConfig) -> Result<Self, ClientError> {
        let channel = dispatcher::with_default(&config.trace, || {
            UnixSocketChannel::connect(path.as_ref(), config.timeout)
        })?;
        Ok(Self::new(channel, config))
    }
}

impl<C: ByteChannel> RpcSession<C> {
    pub fn new(channel: C, config: SessionConfig) -> Self {
        let state = if channel.is_open() {
            SessionState::Connected
        } else {
            SessionState::Closed
        };
        Self {
            next_id: config.id_policy.first_id(),
            channel,
            config,
            state,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Sends `method` with `params` and waits for the daemon's answer.
    ///
    /// A daemon-reported `error` comes back as [`RpcOutcome::Failure`]; only
    /// local transport and protocol problems are `Err`.
    pub fn call(&mut self, method: &str, params: impl Into<Params>) -> Result<RpcOutcome, ClientError> {
        if self.state == SessionState::Closed {
            return Err(ClientError::NotConnected);
        }

        let id = self.next_id;
        let request = RpcRequest::new(id, method, params.into());
        dispatcher::with_default(&self.config.trace, || {
            debug!(method, id, params = %request.params(), "Calling RPC method");
        });

        self.channel.send(&request.to_line()?)?;
        self.next_id = self.config.id_policy.next_id(id);

        let response = read_until_parseable(&mut self.channel, self.config.min_read_size)?;
        dispatcher::with_default(&self.config.trace, || {
            debug!(method, id, %response, "Received RPC response");
        });

        interpret_response(id, response)
    }

    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.channel.close();
        self.state = SessionState::Closed;
        dispatcher::with_default(&self.config.trace, || debug!("RPC session closed"));
    }
}

impl<C: ByteChannel> Drop for RpcSession<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reads from `channel` until the accumulated bytes decode as one JSON value.
///
/// Each read asks for `max(min_read_size, buffered)` bytes. Decoding is
/// attempted only after a short read. Input that is merely truncated keeps
/// the loop going; input that can never become valid JSON fails right away.
/// An empty read on an undecodable buffer means the peer hung up.
pub fn read_until_parseable<C>(channel: &mut C, min_read_size: usize) -> Result<Value, ClientError>
where
    C: ByteChannel + ?Sized,
{
    let floor = min_read_size.max(1);
    let mut buffer: Vec<u8> = Vec::new();

    loop {
        let wanted = floor.max(buffer.len());
        let chunk = channel.receive(wanted)?;
        let peer_closed = chunk.is_empty();
        let short_read = chunk.len() < wanted;
        buffer.extend_from_slice(&chunk);

        if !short_read {
            continue;
        }

        match serde_json::from_slice::<Value>(&buffer) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_eof() => {
                if peer_closed {
                    return Err(ClientError::ConnectionClosed {
                        buffered: buffer.len(),
                    });
                }
            }
            Err(err) => return Err(ProtocolError::MalformedJson(err).into()),
        }
    }
}

fn interpret_response(id: u64, response: Value) -> Result<RpcOutcome, ClientError> {
    let mut response = match response {
        Value::Object(map) => map,
        other => return Err(ProtocolError::NotAnObject(other).into()),
    };

    if let Some(actual) = response.get("id") {
        if actual.as_u64() != Some(id) {
            return Err(ProtocolError::MismatchedId {
                expected: id,
                actual: actual.clone(),
            }
            .into());
        }
    }

    // Any "error" member, null included, is the daemon's answer.
    if let Some(error) = response.remove("error") {
        return Ok(RpcOutcome::Failure(RemoteError::new(error)));
    }

    response
        .remove("result")
        .map(RpcOutcome::Success)
        .ok_or_else(|| ProtocolError::MissingResult.into())
}

/// Connects, runs `f`, and closes the session on every exit path.
pub fn with_session<T, E, F>(path: impl AsRef<Path>, config: SessionConfig, f: F) -> Result<T, E>
where
    E: From<ClientError>,
    F: FnOnce(&mut RpcSession) -> Result<T, E>,
{
    let mut session = RpcSession::connect_with(path, config)?;
    let outcome = f(&mut session);
    session.close();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdPolicy;
    use crate::ScriptedChannel;
    use serde_json::json;

    fn session(channel: ScriptedChannel) -> RpcSession<ScriptedChannel> {
        RpcSession::new(channel, SessionConfig::default())
    }

    #[test]
    fn test_getinfo_returns_result() {
        let mut session = session(
            ScriptedChannel::new().with_response(&json!({"result": {"block_height": 100}})),
        );
        let outcome = session.call("getinfo", Params::empty()).unwrap();
        assert_eq!(outcome, RpcOutcome::Success(json!({"block_height": 100})));

        let sent = session.channel().sent_requests();
        assert_eq!(
            sent,
            vec![json!({"jsonrpc": "2.0", "id": 0, "method": "getinfo", "params": {}})]
        );
    }

    #[test]
    fn test_stop_returns_empty_mapping() {
        let mut session = session(ScriptedChannel::new().with_response(&json!({"result": {}})));
        let outcome = session.call("stop", Params::empty()).unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.success(), Some(json!({})));
    }

    #[test]
    fn test_remote_error_is_returned_not_raised() {
        let payload = json!({"code": -32602, "message": "Invalid params for 'createspend'"});
        let mut session = session(
            ScriptedChannel::new().with_response(&json!({"jsonrpc": "2.0", "id": 0, "error": payload})),
        );
        let outcome = session.call("createspend", Params::empty()).unwrap();
        assert_eq!(outcome.failure().map(RemoteError::payload), Some(&payload));
    }

    #[test]
    fn test_error_takes_precedence_over_result() {
        let mut session = session(
            ScriptedChannel::new().with_response(&json!({"result": {}, "error": {"code": 1}})),
        );
        assert!(session.call("stop", Params::empty()).unwrap().is_failure());
    }

    #[test]
    fn test_null_error_is_a_failure() {
        let mut bare = session(ScriptedChannel::new().with_response(&json!({"id": 0, "error": null})));
        let outcome = bare.call("getinfo", Params::empty()).unwrap();
        assert_eq!(outcome.failure().map(RemoteError::payload), Some(&Value::Null));

        let mut with_result = session(
            ScriptedChannel::new().with_response(&json!({"result": {"ok": 1}, "error": null})),
        );
        assert!(with_result.call("getinfo", Params::empty()).unwrap().is_failure());
    }

    #[test]
    fn test_missing_result_is_protocol_error() {
        let mut session = session(ScriptedChannel::new().with_response(&json!({"jsonrpc": "2.0"})));
        let err = session.call("getinfo", Params::empty()).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::MissingResult)
        ));
    }

    #[test]
    fn test_mismatched_id_is_protocol_error() {
        let mut session = session(ScriptedChannel::new().with_response(&json!({"id": 3, "result": {}})));
        let err = session.call("getinfo", Params::empty()).unwrap_err();
        match err {
            ClientError::Protocol(ProtocolError::MismatchedId { expected, actual }) => {
                assert_eq!(expected, 0);
                assert_eq!(actual, json!(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_integer_id_is_mismatch() {
        let mut session = session(ScriptedChannel::new().with_response(&json!({"id": "0", "result": {}})));
        assert!(session.call("getinfo", Params::empty()).unwrap_err().is_protocol_error());
    }

    #[test]
    fn test_non_object_response_is_protocol_error() {
        let mut session = session(ScriptedChannel::new().with_response(&json!([1, 2, 3])));
        let err = session.call("getinfo", Params::empty()).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::NotAnObject(_))
        ));
    }

    #[test]
    fn test_two_chunk_response_is_assembled() {
        let mut session = session(
            ScriptedChannel::new()
                .with_chunk(br#"{"result": {"coins": [{"amount": 10"#.to_vec())
                .with_chunk(br#"000, "spend_info": null}]}}"#.to_vec()),
        );
        let outcome = session.call("listcoins", Params::empty()).unwrap();
        assert_eq!(
            outcome,
            RpcOutcome::Success(json!({"coins": [{"amount": 10000, "spend_info": null}]}))
        );
    }

    #[test]
    fn test_one_byte_chunks_are_assembled() {
        let body = serde_json::to_vec(&json!({"result": {"address": "tb1qexample"}})).unwrap();
        let mut session = session(ScriptedChannel::new().with_bytes_in_chunks(&body, 1));
        let outcome = session.call("getnewaddress", Params::empty()).unwrap();
        assert_eq!(outcome, RpcOutcome::Success(json!({"address": "tb1qexample"})));
    }

    #[test]
    fn test_peer_close_mid_response_is_connection_error() {
        let mut session = session(ScriptedChannel::new().with_chunk(br#"{"result": {"coi"#.to_vec()));
        let err = session.call("listcoins", Params::empty()).unwrap_err();
        assert!(matches!(err, ClientError::ConnectionClosed { buffered: 16 }));
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_peer_close_without_data_is_connection_error() {
        let mut session = session(ScriptedChannel::new());
        let err = session.call("getinfo", Params::empty()).unwrap_err();
        assert!(matches!(err, ClientError::ConnectionClosed { buffered: 0 }));
    }

    #[test]
    fn test_garbage_fails_fast() {
        let mut session = session(ScriptedChannel::new().with_chunk(b"HTTP/1.1 400 Bad Request\r\n".to_vec()));
        let err = session.call("getinfo", Params::empty()).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::MalformedJson(_))
        ));
    }

    #[test]
    fn test_read_size_grows_with_buffer() {
        // {"result":"xxx…"}\n padded to exactly 10000 bytes
        let filler = "x".repeat(10_000 - 14);
        let body = format!("{{\"result\":\"{filler}\"}}\n");
        assert_eq!(body.len(), 10_000);

        let mut channel = ScriptedChannel::new().with_chunk(body.into_bytes());
        let value = read_until_parseable(&mut channel, 2048).unwrap();
        assert_eq!(value["result"].as_str().map(str::len), Some(10_000 - 14));
        assert_eq!(channel.requested_sizes(), &[2048, 2048, 4096, 8192]);
    }

    #[test]
    fn test_full_reads_do_not_trigger_parse() {
        // A complete value that exactly fills the first read is only decoded
        // after the next (short) read.
        let mut body = br#"{"result":1}"#.to_vec();
        body.resize(16, b' ');
        let mut channel = ScriptedChannel::new()
            .with_chunk(body)
            .with_chunk(b"\n".to_vec());
        let value = read_until_parseable(&mut channel, 16).unwrap();
        assert_eq!(value, json!({"result": 1}));
        assert_eq!(channel.requested_sizes(), &[16, 16]);
    }

    #[test]
    fn test_fixed_id_policy_reuses_zero() {
        let mut session = session(
            ScriptedChannel::new()
                .with_response(&json!({"id": 0, "result": {}}))
                .with_response(&json!({"id": 0, "result": {}})),
        );
        session.call("stop", Params::empty()).unwrap();
        session.call("stop", Params::empty()).unwrap();
        let ids: Vec<Value> = session
            .channel()
            .sent_requests()
            .iter()
            .map(|r| r["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!(0), json!(0)]);
    }

    #[test]
    fn test_incrementing_id_policy() {
        let channel = ScriptedChannel::new()
            .with_response(&json!({"id": 0, "result": {}}))
            .with_response(&json!({"id": 1, "result": {}}));
        let config = SessionConfig::default().with_id_policy(IdPolicy::Incrementing);
        let mut session = RpcSession::new(channel, config);
        session.call("getinfo", Params::empty()).unwrap();
        session.call("getinfo", Params::empty()).unwrap();
        let ids: Vec<Value> = session
            .channel()
            .sent_requests()
            .iter()
            .map(|r| r["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!(0), json!(1)]);
    }

    #[test]
    fn test_call_after_close_fails() {
        let mut session = session(ScriptedChannel::new().with_response(&json!({"result": {}})));
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.channel().is_open());
        assert!(matches!(
            session.call("getinfo", Params::empty()),
            Err(ClientError::NotConnected)
        ));
        assert!(session.channel().sent_requests().is_empty());
    }
}
