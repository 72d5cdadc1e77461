//! The AggregateResults action: collect raw results from every provider.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use c2p_oscal::apply_to_component;
use c2p_plugin::PluginId;
use c2p_policy::{Provider, ProviderError, PvpResult};

use crate::context::InputContext;
use crate::error::FrameworkError;

/// What an aggregate run produced.
///
/// Results arrive in completion order; callers must not depend on ordering.
/// Results received before a cancellation are preserved alongside the
/// cancellation error. For providers `P`:
/// `results.len() + skipped.len() + errors.len() == P.len()`.
#[derive(Default)]
pub struct AggregateOutcome {
    pub results: Vec<PvpResult>,
    /// Providers skipped because no validation component references them.
    pub skipped: Vec<PluginId>,
    pub errors: Vec<FrameworkError>,
}

impl AggregateOutcome {
    /// The joined per-provider error, if any provider failed.
    pub fn into_error(self) -> Option<FrameworkError> {
        FrameworkError::join(self.errors)
    }

    /// Collapses the outcome, dropping partial results on failure.
    pub fn into_result(self) -> Result<Vec<PvpResult>, FrameworkError> {
        match FrameworkError::join(self.errors) {
            Some(err) => Err(err),
            None => Ok(self.results),
        }
    }
}

/// Executes GetResults on each provider with its effective rule sets and
/// collects the raw results.
///
/// Same fan-out contract as Generate: bounded concurrency, soft skip for
/// missing providers, per-provider errors joined rather than first-wins.
pub async fn aggregate_results(
    token: &CancellationToken,
    context: &InputContext,
    plugins: &HashMap<PluginId, Arc<dyn Provider>>,
) -> AggregateOutcome {
    let mut outcome = AggregateOutcome::default();
    if plugins.is_empty() {
        return outcome;
    }

    let semaphore = Arc::new(Semaphore::new(context.max_concurrent_weight()));
    let mut tasks: JoinSet<Result<PvpResult, FrameworkError>> = JoinSet::new();

    for (id, provider) in plugins {
        let title = match context.provider_title(id) {
            Ok(title) => title.to_string(),
            Err(_) => {
                tracing::warn!(provider = %id, "skipping provider: missing validation component");
                outcome.skipped.push(id.clone());
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

            tracing::debug!(provider = %id, "aggregating results");
            tokio::select! {
                _ = token.cancelled() => Err(FrameworkError::Provider {
                    id,
                    source: ProviderError::Cancelled,
                }),
                result = provider.get_results(policy) => {
                    result.map_err(|source| FrameworkError::Provider { id, source })
                }
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(result)) => outcome.results.push(result),
            Ok(Err(err)) => outcome.errors.push(err),
            Err(join_err) => outcome.errors.push(FrameworkError::InternalInvariant(format!(
                "aggregate task failed: {join_err}"
            ))),
        }
    }
    outcome
}
