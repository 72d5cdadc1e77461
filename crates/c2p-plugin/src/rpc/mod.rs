//! The host↔plugin RPC surface: newline-delimited JSON-RPC 2.0 frames over
//! the child's stdio, plus the launch handshake.
//!
//! The orchestrator treats the transport as an opaque bidirectional
//! channel; the handshake line names the transport so a future protocol can
//! negotiate differently without changing discovery or supervision.

pub mod channel;
pub mod wire;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::PROTOCOL_VERSION;

/// Transport token declared in the handshake line.
pub const TRANSPORT: &str = "jsonrpc";

/// Method a host uses to request a named capability.
pub const METHOD_DISPENSE: &str = "plugin.dispense";
/// One-shot configuration of a dispensed capability.
pub const METHOD_CONFIGURE: &str = "pvp.configure";
/// Ships rule sets so the plugin can materialize policy.
pub const METHOD_GENERATE: &str = "pvp.generate";
/// Asks the plugin to evaluate rule sets and return raw results.
pub const METHOD_GET_RESULTS: &str = "pvp.get_results";
/// Notification a plugin sends to have the host log on its behalf.
pub const METHOD_LOG: &str = "plugin.log";

pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// The plugin does not implement the requested capability.
    pub const CAPABILITY_UNAVAILABLE: i64 = -32000;
}

/// A request frame sent host → plugin.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// An error body inside a response frame.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A frame received plugin → host: a response to a request (`id` present)
/// or a notification such as `plugin.log` (`method` present, no `id`).
#[derive(Debug, Deserialize)]
pub struct IncomingFrame {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

/// A response frame sent plugin → host.
#[derive(Debug, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Parameters of a `plugin.log` notification.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogParams {
    #[serde(default)]
    pub level: Option<String>,
    pub message: String,
}

/// The handshake line a plugin prints on stdout once it is ready:
/// `<protocol-version>|<transport>`.
pub fn handshake_line() -> String {
    format!("{PROTOCOL_VERSION}|{TRANSPORT}")
}

/// Validates a received handshake line; returns the reason on mismatch.
pub fn validate_handshake_line(line: &str) -> Result<(), String> {
    let mut parts = line.trim().split('|');
    let version = parts.next().unwrap_or_default();
    let transport = parts.next().unwrap_or_default();

    if version != PROTOCOL_VERSION.to_string() {
        return Err(format!(
            "protocol version mismatch: host speaks {PROTOCOL_VERSION}, plugin announced {version:?}"
        ));
    }
    if transport != TRANSPORT {
        return Err(format!("unsupported transport {transport:?}"));
    }
    if parts.next().is_some() {
        return Err("malformed handshake line".into());
    }
    Ok(())
}
