//! The Generate action: fan out policy generation to every provider.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use c2p_oscal::apply_to_component;
use c2p_plugin::PluginId;
use c2p_policy::{Provider, ProviderError};

use crate::context::InputContext;
use crate::error::FrameworkError;

/// Executes Generate on each provider with its effective rule sets.
///
/// Providers run concurrently, throttled by the context's concurrency
/// budget. A provider with no matching validation component is skipped
/// with a warning. Individual failures do not abort the others; all
/// per-provider errors are joined into the returned error.
pub async fn generate_policy(
    token: &CancellationToken,
    context: &InputContext,
    plugins: &HashMap<PluginId, Arc<dyn Provider>>,
) -> Result<(), FrameworkError> {
    if plugins.is_empty() {
        return Ok(());
    }

    let semaphore = Arc::new(Semaphore::new(context.max_concurrent_weight()));
    let mut tasks: JoinSet<Result<(), FrameworkError>> = JoinSet::new();

    for (id, provider) in plugins {
        let title = match context.provider_title(id) {
            Ok(title) => title.to_string(),
            Err(_) => {
                tracing::warn!(provider = %id, "skipping provider: missing validation component");
                continue;
            }
        };
        let effective = apply_to_component(&title, context.store(), context.settings());

        let id = id.clone();
        let provider = provider.clone();
        let semaphore = semaphore.clone();
        let token = token.clone();
        tasks.spawn(async move {
            let _permit = tokio::select! {
                _ = token.cancelled() => {
                    return Err(FrameworkError::Provider {
                        id,
                        source: ProviderError::Cancelled,
                    });
                }
                permit = semaphore.acquire_owned() => permit
                    .map_err(|_| FrameworkError::InternalInvariant("semaphore closed".into()))?,
            };

            let policy = effective.map_err(|source| FrameworkError::ComponentRules {
                title,
                source,
            })?;

            tracing::debug!(provider = %id, "generating policy");
            tokio::select! {
                _ = token.cancelled() => Err(FrameworkError::Provider {
                    id,
                    source: ProviderError::Cancelled,
                }),
                result = provider.generate(policy) => {
                    result.map_err(|source| FrameworkError::Provider { id, source })
                }
            }
        });
    }

    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => errors.push(err),
            Err(join_err) => errors.push(FrameworkError::InternalInvariant(format!(
                "generate task failed: {join_err}"
            ))),
        }
    }

    match FrameworkError::join(errors) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
