//! Supervised launch and teardown of plugin child processes.

use std::io::Read;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::client::PolicyPlugin;
use crate::error::PluginError;
use crate::identity::PluginId;
use crate::manifest::Manifest;
use crate::rpc::channel::RpcChannel;
use crate::rpc::validate_handshake_line;
use crate::{MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE};

/// How long a freshly spawned plugin gets to print its handshake line.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

struct ManagedChild {
    id: PluginId,
    child: Child,
}

/// Launches plugin executables and owns the resulting child handles.
///
/// The supervisor verifies the executable against the manifest checksum,
/// spawns it with the handshake cookie in the environment, validates the
/// stdout handshake line, and registers the child so [`Supervisor::cleanup`]
/// can terminate everything outstanding.
#[derive(Default)]
pub struct Supervisor {
    children: Mutex<Vec<ManagedChild>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launches the plugin described by the manifest and returns its RPC
    /// channel.
    pub async fn launch(&self, manifest: &Manifest) -> Result<Arc<RpcChannel>, PluginError> {
        let id = manifest.metadata.id.clone();
        verify_checksum(&manifest.executable_path, &manifest.checksum)?;

        let mut child = Command::new(&manifest.executable_path)
            .env(MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Stderr stays the plugin's own; surface it for debugging.
        if let Some(stderr) = child.stderr.take() {
            forward_stderr(id.clone(), stderr);
        }

        let stdin = child.stdin.take().ok_or_else(|| PluginError::HandshakeFailed {
            id: id.clone(),
            reason: "child stdin is not piped".into(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| PluginError::HandshakeFailed {
            id: id.clone(),
            reason: "child stdout is not piped".into(),
        })?;

        let mut reader = RpcChannel::lines(Box::new(stdout));
        let line = match tokio::time::timeout(HANDSHAKE_TIMEOUT, reader.next_line()).await {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => {
                return Err(self.handshake_failure(child, id, "plugin exited before handshake").await);
            }
            Ok(Err(err)) => {
                return Err(self.handshake_failure(child, id, err.to_string()).await);
            }
            Err(_) => {
                return Err(self
                    .handshake_failure(child, id, "timed out waiting for handshake")
                    .await);
            }
        };
        if let Err(reason) = validate_handshake_line(&line) {
            return Err(self.handshake_failure(child, id, reason).await);
        }

        tracing::debug!(plugin = %id, "plugin handshake complete");

        let channel = Arc::new(RpcChannel::new(id.clone(), reader, Box::new(stdin)));
        self.children.lock().await.push(ManagedChild { id, child });
        Ok(channel)
    }

    /// Requests the named capability from a launched plugin.
    pub async fn dispense(
        &self,
        channel: Arc<RpcChannel>,
        capability: &str,
    ) -> Result<PolicyPlugin, PluginError> {
        let id = channel.plugin_id().clone();
        let params = serde_json::json!({ "capability": capability });
        channel
            .call(crate::rpc::METHOD_DISPENSE, params)
            .await
            .map_err(|_| PluginError::CapabilityUnavailable {
                id: id.clone(),
                capability: capability.to_string(),
            })?;
        Ok(PolicyPlugin::new(id, channel))
    }

    /// Kills every managed child. Idempotent; safe to call from teardown
    /// paths regardless of how far launch got.
    pub async fn cleanup(&self) {
        let mut children = self.children.lock().await;
        for managed in children.iter_mut() {
            match managed.child.start_kill() {
                Ok(()) => tracing::debug!(plugin = %managed.id, "killed plugin process"),
                Err(err) => {
                    tracing::debug!(plugin = %managed.id, error = %err, "plugin already exited")
                }
            }
            let _ = managed.child.wait().await;
        }
        children.clear();
    }

    async fn handshake_failure(
        &self,
        mut child: Child,
        id: PluginId,
        reason: impl Into<String>,
    ) -> PluginError {
        let _ = child.start_kill();
        let _ = child.wait().await;
        PluginError::HandshakeFailed {
            id,
            reason: reason.into(),
        }
    }
}

/// Verifies the executable's SHA-256 digest against the manifest checksum.
fn verify_checksum(path: &Path, expected: &str) -> Result<(), PluginError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let actual = hex::encode(hasher.finalize());

    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(PluginError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Re-emits the plugin's stderr lines through the host logger.
fn forward_stderr(id: PluginId, stderr: impl AsyncRead + Send + Unpin + 'static) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(plugin = %id, "{line}");
        }
    });
}
