use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::error::ClientError;

const JSONRPC_VERSION: &str = "2.0";

/// Parameters of a JSON-RPC call: named (an object) or positional (an array).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    Positional(Vec<Value>),
    Named(Map<String, Value>),
}

impl Params {
    /// The empty mapping, sent when a method takes no arguments.
    pub fn empty() -> Self {
        Params::Named(Map::new())
    }

    /// Builds params from positional and named arguments, refusing to mix
    /// the two.
    pub fn from_parts(positional: Vec<Value>, named: Map<String, Value>) -> Result<Self, ClientError> {
        match (positional.is_empty(), named.is_empty()) {
            (false, false) => Err(ClientError::InvalidParams(
                "Cannot mix positional and non-positional arguments".to_string(),
            )),
            (false, true) => Ok(Params::Positional(positional)),
            _ => Ok(Params::Named(named)),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Params::Positional(values) => values.is_empty(),
            Params::Named(map) => map.is_empty(),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Params::Named(map)
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

impl TryFrom<Value> for Params {
    type Error = ClientError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Params::Named(map)),
            Value::Array(values) => Ok(Params::Positional(values)),
            Value::Null => Ok(Params::empty()),
            other => Err(ClientError::InvalidParams(format!(
                "params must be an object or an array, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("<unserializable params>"),
        }
    }
}

/// One JSON-RPC 2.0 request. Built per call and never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    jsonrpc: String,
    id: u64,
    method: String,
    params: Params,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Params) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Wire encoding: the JSON object followed by a newline.
    pub fn to_line(&self) -> Result<Vec<u8>, ClientError> {
        let mut line = serde_json::to_vec(self).map_err(ClientError::SerializationFailed)?;
        line.push(b'\n');
        Ok(line)
    }
}

/// The `error` member of a daemon response, kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    payload: Value,
}

impl RemoteError {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }

    pub fn code(&self) -> Option<i64> {
        self.payload.get("code").and_then(Value::as_i64)
    }

    pub fn message(&self) -> Option<&str> {
        match &self.payload {
            Value::String(message) => Some(message),
            other => other.get("message").and_then(Value::as_str),
        }
    }

    /// `{"error": <payload>}`
    pub fn to_json(&self) -> Value {
        json!({ "error": self.payload })
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code(), self.message()) {
            (Some(code), Some(message)) => write!(f, "RPC error ({code}): {message}"),
            (None, Some(message)) => write!(f, "RPC error: {message}"),
            _ => write!(f, "RPC error: {}", self.payload),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Result of a call that reached the daemon: either its `result` or the
/// error it reported. Remote errors are values, not `Err`s, so callers branch
/// on them without unwinding through `?`.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum RpcOutcome<T = Value> {
    Success(T),
    Failure(RemoteError),
}

impl<T> RpcOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, RpcOutcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RpcOutcome::Failure(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            RpcOutcome::Success(value) => Some(value),
            RpcOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RemoteError> {
        match self {
            RpcOutcome::Success(_) => None,
            RpcOutcome::Failure(err) => Some(err),
        }
    }

    pub fn map<U, F>(self, f: F) -> RpcOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            RpcOutcome::Success(value) => RpcOutcome::Success(f(value)),
            RpcOutcome::Failure(err) => RpcOutcome::Failure(err),
        }
    }

    pub fn into_result(self) -> Result<T, RemoteError> {
        match self {
            RpcOutcome::Success(value) => Ok(value),
            RpcOutcome::Failure(err) => Err(err),
        }
    }
}

impl<T: Serialize> RpcOutcome<T> {
    /// The success value as JSON, or `{"error": <payload>}`.
    pub fn to_json(&self) -> Value {
        match self {
            RpcOutcome::Success(value) => serde_json::to_value(value).unwrap_or(Value::Null),
            RpcOutcome::Failure(err) => err.to_json(),
        }
    }
}
