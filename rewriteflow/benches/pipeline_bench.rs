//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rewriteflow::config::PipelineConfig;
use rewriteflow::core::{text, StageName};
use rewriteflow::pipeline::{PipelineExecutor, PluginRegistry};
use rewriteflow::stages::{Stage, StageCatalog};
use rewriteflow::testing::{MockStage, ScriptedMetricsOracle, ScriptedPerplexityOracle};
use std::sync::Arc;

const PARAGRAPH: &str = "It is important to note that the implementation of the aforementioned \
    solution will facilitate the utilization of resources in an efficient manner. \
    Furthermore, it should be emphasized that stakeholders will leverage these synergies.";

fn executor() -> PipelineExecutor {
    let catalog = StageName::ALL.iter().fold(StageCatalog::new(), |catalog, &name| {
        let stage: Arc<dyn Stage> = match name {
            StageName::Paraphrase => Arc::new(MockStage::replacing("utilization", "use")),
            StageName::Naturalize => Arc::new(MockStage::replacing("Furthermore, ", "")),
            _ => Arc::new(MockStage::passthrough()),
        };
        catalog.with_stage(name, stage)
    });
    PipelineExecutor::builder()
        .catalog(catalog)
        .metrics_oracle(Arc::new(ScriptedMetricsOracle::new(65.0)))
        .language_model(Arc::new(ScriptedPerplexityOracle::new(42.0)))
        .registry(&PluginRegistry::new())
        .build()
}

fn pipeline_benchmark(c: &mut Criterion) {
    let executor = executor();
    let config = PipelineConfig::new("en").with_seed(7).with_keep_keyword("stakeholders");

    c.bench_function("run_full_catalog", |b| {
        b.iter(|| executor.run(black_box(PARAGRAPH), &config))
    });

    let natural = PipelineExecutor::builder()
        .stage(StageName::Typography, Arc::new(MockStage::passthrough()))
        .metrics_oracle(Arc::new(ScriptedMetricsOracle::new(2.0)))
        .registry(&PluginRegistry::new())
        .build();
    c.bench_function("run_fast_path", |b| {
        b.iter(|| natural.run(black_box(PARAGRAPH), &config))
    });

    let rewritten = PARAGRAPH.replace("utilization", "use");
    c.bench_function("change_ratio", |b| {
        b.iter(|| text::change_ratio(black_box(PARAGRAPH), black_box(&rewritten)))
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
