//! Out-of-process policy-engine plugins: on-disk manifests, discovery,
//! checksum-pinned launch, and the RPC adapter that turns a child process
//! into a [`c2p_policy::Provider`].
//!
//! Plugins are separate binaries described by `c2p-<id>-manifest.json`
//! files in a plugin directory. The host verifies the executable against
//! the manifest checksum, spawns it, performs a handshake over the child's
//! stdio, and then speaks newline-delimited JSON-RPC on the same pipes.

pub mod client;
pub mod discovery;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod rpc;
pub mod serve;
pub mod supervisor;

pub use client::PolicyPlugin;
pub use discovery::{find_plugins, FindOptions};
pub use error::PluginError;
pub use identity::PluginId;
pub use manifest::{ConfigurationOption, Manifest, ManifestSet, Metadata};
pub use serve::{serve, serve_connection};
pub use supervisor::Supervisor;

/// Capability name the orchestrator dispenses from every plugin.
pub const PVP_CAPABILITY: &str = "pvp";

/// Protocol version that must match between the host and plugins.
pub const PROTOCOL_VERSION: u32 = 1;

/// Environment variable carrying the handshake cookie to the child.
pub const MAGIC_COOKIE_KEY: &str = "C2P_PLUGIN_MAGIC_COOKIE";

/// Fixed cookie value shared by host and plugins. Do NOT change.
pub const MAGIC_COOKIE_VALUE: &str =
    "4fc73041107cf346f76f14d178c3ce63ebb7f6d09d7e2e3983a5737e149e3bfb";
