use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::error::{ExecutionError, StepFailure};
use crate::converter::{Converted, DEFAULT_MIME_TYPE};
use crate::metrics;
use crate::registry::{normalize_label, Chain, ChainStep, ConversionRegistry, EdgeKey};

/// Result of a successful execution.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub output: Converted,
    /// The chain that produced `output`.
    pub chain: Chain,
    /// How many alternate chains were started after the first failed.
    pub fallbacks: u32,
    pub duration_ms: u64,
}

/// Runs conversion chains against a frozen registry, with fallback.
///
/// Steps run strictly in order, each on tokio's blocking pool so slow
/// adapters never stall the async workers.
#[derive(Debug, Clone)]
pub struct ChainExecutor {
    registry: Arc<ConversionRegistry>,
    max_fallback_attempts: u32,
}

impl ChainExecutor {
    pub fn new(registry: Arc<ConversionRegistry>, max_fallback_attempts: u32) -> Self {
        Self {
            registry,
            max_fallback_attempts,
        }
    }

    pub fn registry(&self) -> &ConversionRegistry {
        &self.registry
    }

    /// Picks the initial chain: the direct edge when registered, otherwise
    /// the shortest multi-hop chain.
    pub fn plan(&self, source: &str, target: &str) -> Result<Chain, ExecutionError> {
        let source = normalize_label(source);
        let target = normalize_label(target);
        if source == target {
            return Ok(Chain::empty());
        }

        match self.registry.resolve(&source, &target) {
            Ok(adapter) => Ok(Chain::new(vec![ChainStep {
                source,
                target,
                adapter,
            }])),
            Err(_) => Ok(self.registry.find_chain(&source, &target)?),
        }
    }

    /// Plans and executes `source -> target` over `content`.
    pub async fn convert(
        &self,
        content: Vec<u8>,
        source: &str,
        target: &str,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let chain = self.plan(source, target)?;
        self.execute(content, source, target, chain).await
    }

    /// Executes `chain`, falling back to alternates that avoid failed edges.
    ///
    /// Each failure adds the failing edge to the exclusion set. An alternate
    /// is only tried if it differs from every chain already attempted, and
    /// at most `max_fallback_attempts` alternates are tried.
    pub async fn execute(
        &self,
        content: Vec<u8>,
        source: &str,
        target: &str,
        chain: Chain,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let started = Instant::now();
        let content: Arc<Vec<u8>> = Arc::new(content);

        let mut chain = chain;
        let mut tried: Vec<Chain> = Vec::new();
        let mut exclude: HashSet<EdgeKey> = HashSet::new();
        let mut fallbacks = 0u32;

        loop {
            debug!(chain = %chain.describe(), fallbacks, "Running conversion chain");

            let failure = match run_chain(Arc::clone(&content), &chain).await {
                Ok(output) => {
                    let duration_ms = started.elapsed().as_millis() as u64;
                    metrics::CHAIN_LENGTH
                        .with_label_values(&[])
                        .observe(chain.len() as f64);
                    info!(
                        chain = %chain.describe(),
                        chain_len = chain.len(),
                        fallbacks,
                        duration_ms,
                        "Conversion chain succeeded"
                    );
                    return Ok(ExecutionOutcome {
                        output,
                        chain,
                        fallbacks,
                        duration_ms,
                    });
                }
                Err(failure) => failure,
            };

            warn!(
                source = %failure.edge.0,
                target = %failure.edge.1,
                step = failure.step_index,
                error = %failure.message,
                "Conversion step failed"
            );
            tried.push(chain);

            if fallbacks >= self.max_fallback_attempts {
                metrics::CHAIN_FALLBACKS
                    .with_label_values(&["exhausted"])
                    .inc();
                return Err(ExecutionError::from_failure(failure, tried.len()));
            }

            exclude.insert(failure.edge.clone());
            match self
                .registry
                .find_chain_excluding(source, target, &exclude)
            {
                Ok(alternate) if !tried.contains(&alternate) => {
                    metrics::CHAIN_FALLBACKS
                        .with_label_values(&["attempted"])
                        .inc();
                    info!(
                        chain = %alternate.describe(),
                        excluded = exclude.len(),
                        "Trying alternate conversion chain"
                    );
                    fallbacks += 1;
                    chain = alternate;
                }
                Ok(_) => {
                    metrics::CHAIN_FALLBACKS
                        .with_label_values(&["repeated"])
                        .inc();
                    return Err(ExecutionError::from_failure(failure, tried.len()));
                }
                Err(_) => {
                    metrics::CHAIN_FALLBACKS
                        .with_label_values(&["no_route"])
                        .inc();
                    return Err(ExecutionError::from_failure(failure, tried.len()));
                }
            }
        }
    }
}

/// Threads `(bytes, mime)` through every step of `chain`.
///
/// The empty chain returns the input with the default mime type.
pub async fn run_chain(content: Arc<Vec<u8>>, chain: &Chain) -> Result<Converted, StepFailure> {
    let mut current = content;
    let mut mime = DEFAULT_MIME_TYPE.to_string();

    for (index, step) in chain.steps().iter().enumerate() {
        let adapter = step.adapter.clone();
        let hint = step.target.clone();
        let input = Arc::clone(&current);

        let result = tokio::task::spawn_blocking(move || adapter.convert(&input, &hint)).await;
        let converted = match result {
            Ok(Ok(converted)) => converted,
            Ok(Err(e)) => {
                metrics::STEP_FAILURES.inc();
                return Err(StepFailure {
                    edge: step.edge(),
                    step_index: index,
                    message: e.to_string(),
                });
            }
            Err(join_error) => {
                metrics::STEP_FAILURES.inc();
                return Err(StepFailure {
                    edge: step.edge(),
                    step_index: index,
                    message: format!("Converter task failed: {}", join_error),
                });
            }
        };

        current = Arc::new(converted.content);
        mime = converted.mime_type;
    }

    let content = Arc::try_unwrap(current).unwrap_or_else(|shared| shared.as_ref().clone());
    Ok(Converted::new(content, mime))
}
