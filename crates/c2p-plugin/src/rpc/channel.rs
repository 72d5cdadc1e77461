//! The host side of the RPC channel: serialized request/response exchange
//! with log-notification forwarding.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;

use c2p_policy::ProviderError;

use super::{IncomingFrame, LogParams, Request, METHOD_LOG};
use crate::identity::PluginId;

type Reader = Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

struct ChannelInner {
    reader: Reader,
    writer: Writer,
    next_id: u64,
}

/// One plugin's RPC pipe pair.
///
/// The protocol does not support interleaved requests, so the whole
/// exchange happens under one lock: write the request, then read frames
/// until the matching response arrives. Notifications received in between
/// are forwarded to the host logger.
pub struct RpcChannel {
    plugin: PluginId,
    inner: Mutex<ChannelInner>,
}

impl RpcChannel {
    pub fn new(plugin: PluginId, reader: Reader, writer: Writer) -> Self {
        Self {
            plugin,
            inner: Mutex::new(ChannelInner {
                reader,
                writer,
                next_id: 1,
            }),
        }
    }

    /// Wraps a raw reader in the line-framing the channel expects.
    pub fn lines(reader: Box<dyn AsyncRead + Send + Unpin>) -> Reader {
        BufReader::new(reader).lines()
    }

    pub fn plugin_id(&self) -> &PluginId {
        &self.plugin
    }

    /// Performs one request/response exchange.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let frame = serde_json::to_string(&Request::new(id, method, params))
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        inner
            .writer
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| self.write_error(e))?;
        inner
            .writer
            .write_all(b"\n")
            .await
            .map_err(|e| self.write_error(e))?;
        inner.writer.flush().await.map_err(|e| self.write_error(e))?;

        loop {
            let line = inner
                .reader
                .next_line()
                .await
                .map_err(|e| ProviderError::Transport(e.to_string()))?
                .ok_or(ProviderError::PluginDead)?;
            if line.trim().is_empty() {
                continue;
            }

            let frame: IncomingFrame = match serde_json::from_str(&line) {
                Ok(frame) => frame,
                Err(err) => {
                    tracing::warn!(plugin = %self.plugin, error = %err, "dropping undecodable frame");
                    continue;
                }
            };

            match frame.id {
                Some(frame_id) if frame_id == id => {
                    if let Some(error) = frame.error {
                        return Err(ProviderError::Plugin {
                            code: error.code,
                            message: error.message,
                        });
                    }
                    return Ok(frame.result.unwrap_or(Value::Null));
                }
                Some(frame_id) => {
                    tracing::warn!(
                        plugin = %self.plugin,
                        expected = id,
                        got = frame_id,
                        "dropping response for unknown request"
                    );
                }
                None => self.handle_notification(frame),
            }
        }
    }

    /// A closed pipe means the child is gone.
    fn write_error(&self, err: std::io::Error) -> ProviderError {
        if err.kind() == std::io::ErrorKind::BrokenPipe {
            ProviderError::PluginDead
        } else {
            ProviderError::Transport(err.to_string())
        }
    }

    fn handle_notification(&self, frame: IncomingFrame) {
        if frame.method.as_deref() != Some(METHOD_LOG) {
            tracing::debug!(
                plugin = %self.plugin,
                method = frame.method.as_deref().unwrap_or(""),
                "ignoring notification"
            );
            return;
        }
        let Ok(params) = serde_json::from_value::<LogParams>(frame.params) else {
            return;
        };
        let message = params.message;
        match params.level.as_deref() {
            Some("trace") => tracing::trace!(plugin = %self.plugin, "{message}"),
            Some("debug") => tracing::debug!(plugin = %self.plugin, "{message}"),
            Some("warn") => tracing::warn!(plugin = %self.plugin, "{message}"),
            Some("error") => tracing::error!(plugin = %self.plugin, "{message}"),
            _ => tracing::info!(plugin = %self.plugin, "{message}"),
        }
    }
}
