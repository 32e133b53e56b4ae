//! Concurrent processing of independent texts.

use super::executor::PipelineExecutor;
use super::result::PipelineResult;
use crate::config::PipelineConfig;
use crate::errors::{Result, RewriteflowError};
use crate::events::event_types;
use crate::observability::SpanTimer;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Runs `executor` over every text with at most `concurrency` runs in
/// flight. Results come back in input order.
///
/// Each run is synchronous and executes on the blocking pool; runs share
/// nothing but the executor.
///
/// # Errors
///
/// A configuration error (reported once, before any run starts) or a
/// worker that panicked outside the stage isolation boundary.
pub async fn run_batch(
    executor: Arc<PipelineExecutor>,
    texts: Vec<String>,
    config: PipelineConfig,
    concurrency: usize,
) -> Result<Vec<PipelineResult>> {
    config.validate()?;

    let timer = SpanTimer::start("batch");
    let total = texts.len();
    let config = Arc::new(config);
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));

    tracing::info!(texts = total, concurrency = concurrency.max(1), "Batch started");

    let tasks = texts.into_iter().map(|text| {
        let executor = Arc::clone(&executor);
        let config = Arc::clone(&config);
        let permits = Arc::clone(&permits);
        async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|err| RewriteflowError::Join(err.to_string()))?;
            tokio::task::spawn_blocking(move || executor.run(&text, &config))
                .await
                .map_err(|err| RewriteflowError::Join(err.to_string()))?
        }
    });

    let results: Result<Vec<_>> = join_all(tasks).await.into_iter().collect();
    let duration_ms = timer.finish();

    match &results {
        Ok(done) => {
            let modified = done.iter().filter(|r| r.is_modified()).count();
            tracing::info!(texts = total, modified, duration_ms, "Batch completed");
            executor
                .event_sink()
                .emit(
                    event_types::BATCH_COMPLETED,
                    Some(json!({ "texts": total, "modified": modified, "duration_ms": duration_ms })),
                )
                .await;
        }
        Err(err) => tracing::error!(error = %err, "Batch failed"),
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageName;
    use crate::events::CollectingEventSink;
    use crate::pipeline::PluginRegistry;
    use crate::testing::MockStage;

    fn executor(sink: Arc<CollectingEventSink>) -> (Arc<PipelineExecutor>, Arc<MockStage>) {
        let stage = Arc::new(MockStage::appending("."));
        let executor = PipelineExecutor::builder()
            .stage(StageName::Typography, stage.clone())
            .registry(&PluginRegistry::new())
            .event_sink(sink)
            .build();
        (Arc::new(executor), stage)
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let sink = Arc::new(CollectingEventSink::new());
        let (executor, stage) = executor(sink.clone());
        let texts: Vec<String> = (0..20).map(|i| format!("text number {i}")).collect();
        let config = PipelineConfig::new("en").with_seed(3);

        let results = run_batch(executor, texts.clone(), config, 4).await.unwrap();

        assert_eq!(results.len(), 20);
        for (text, result) in texts.iter().zip(&results) {
            assert_eq!(&result.original, text);
            assert_eq!(result.text, format!("{text}."));
        }
        assert_eq!(stage.call_count(), 20);
        assert_eq!(sink.events_of_type(event_types::BATCH_COMPLETED).len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_any_run() {
        let sink = Arc::new(CollectingEventSink::new());
        let (executor, stage) = executor(sink.clone());
        let config = PipelineConfig::new("");

        let err = run_batch(executor, vec!["a".to_string()], config, 2).await;
        assert!(err.is_err());
        assert_eq!(stage.call_count(), 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let sink = Arc::new(CollectingEventSink::new());
        let (executor, _) = executor(sink);
        let results = run_batch(executor, Vec::new(), PipelineConfig::default(), 0).await.unwrap();
        assert!(results.is_empty());
    }
}
