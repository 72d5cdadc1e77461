//! The plugin side of the RPC surface.
//!
//! A plugin binary builds its [`Provider`] implementation and hands it to
//! [`serve`] from `main`. The loop performs the handshake and dispatches
//! requests from the host until stdin closes.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use c2p_policy::{Provider, ProviderError};

use crate::rpc::wire::{request_to_policy, result_to_wire, PolicyRequest};
use crate::rpc::{
    error_codes, handshake_line, Request, Response, METHOD_CONFIGURE, METHOD_DISPENSE,
    METHOD_GENERATE, METHOD_GET_RESULTS,
};
use crate::{MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE, PVP_CAPABILITY};

#[derive(Deserialize)]
struct DispenseParams {
    capability: String,
}

#[derive(Deserialize)]
struct ConfigureParams {
    #[serde(default)]
    options: HashMap<String, String>,
}

#[derive(Deserialize)]
struct PolicyParams {
    request: PolicyRequest,
}

/// Serves a provider over stdio. Called last from a plugin's `main`.
///
/// Verifies the handshake cookie the host placed in the environment, prints
/// the handshake line, and then dispatches requests until the host closes
/// the pipe.
pub async fn serve<P: Provider>(provider: P) -> std::io::Result<()> {
    if std::env::var(MAGIC_COOKIE_KEY).as_deref() != Ok(MAGIC_COOKIE_VALUE) {
        eprintln!("this binary is a c2p plugin and is not meant to be run directly");
        return Err(std::io::Error::other("handshake cookie missing"));
    }
    serve_connection(provider, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serves a provider over an explicit pipe pair. [`serve`] binds this to
/// stdio; tests bind it to in-process duplex streams.
pub async fn serve_connection<P, R, W>(provider: P, reader: R, mut writer: W) -> std::io::Result<()>
where
    P: Provider,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(format!("{}\n", handshake_line()).as_bytes())
        .await?;
    writer.flush().await?;

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => dispatch(&provider, request).await,
            Err(_) => Response::err(0, error_codes::PARSE_ERROR, "undecodable request frame"),
        };
        let frame = serde_json::to_string(&response)?;
        writer.write_all(frame.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

async fn dispatch<P: Provider>(provider: &P, request: Request) -> Response {
    let id = request.id;
    match request.method.as_str() {
        METHOD_DISPENSE => match serde_json::from_value::<DispenseParams>(request.params) {
            Ok(params) if params.capability == PVP_CAPABILITY => {
                Response::ok(id, serde_json::json!({ "ok": true }))
            }
            Ok(params) => Response::err(
                id,
                error_codes::CAPABILITY_UNAVAILABLE,
                format!("unsupported capability {}", params.capability),
            ),
            Err(err) => Response::err(id, error_codes::INVALID_PARAMS, err.to_string()),
        },
        METHOD_CONFIGURE => match serde_json::from_value::<ConfigureParams>(request.params) {
            Ok(params) => match provider.configure(params.options).await {
                Ok(()) => Response::ok(id, Value::Null),
                Err(err) => provider_error(id, err),
            },
            Err(err) => Response::err(id, error_codes::INVALID_PARAMS, err.to_string()),
        },
        METHOD_GENERATE => match serde_json::from_value::<PolicyParams>(request.params) {
            Ok(params) => match provider.generate(request_to_policy(&params.request)).await {
                Ok(()) => Response::ok(id, Value::Null),
                Err(err) => provider_error(id, err),
            },
            Err(err) => Response::err(id, error_codes::INVALID_PARAMS, err.to_string()),
        },
        METHOD_GET_RESULTS => match serde_json::from_value::<PolicyParams>(request.params) {
            Ok(params) => match provider.get_results(request_to_policy(&params.request)).await {
                Ok(result) => match serde_json::to_value(result_to_wire(&result)) {
                    Ok(value) => Response::ok(id, value),
                    Err(err) => {
                        Response::err(id, error_codes::INTERNAL_ERROR, err.to_string())
                    }
                },
                Err(err) => provider_error(id, err),
            },
            Err(err) => Response::err(id, error_codes::INVALID_PARAMS, err.to_string()),
        },
        other => Response::err(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("unknown method {other}"),
        ),
    }
}

fn provider_error(id: u64, err: ProviderError) -> Response {
    match err {
        ProviderError::Plugin { code, message } => Response::err(id, code, message),
        other => Response::err(id, error_codes::INTERNAL_ERROR, other.to_string()),
    }
}
