//! The pipeline executor.
//!
//! One public call runs up to `1 + retry.factors.len()` attempts. Each
//! attempt is strictly sequential:
//!
//! 1. adaptive intensity decision from the input's artificiality score
//! 2. watermark cleaning, span protection
//! 3. the stage loop (hooks, isolated stage, hooks, gate, checkpoint), or
//!    the typography-only fast path
//! 4. span restoration, validation, partial or full rollback
//!
//! Stage and oracle failures never leave this module as errors.

use super::gate::{GateVerdict, PerplexityGate};
use super::intensity::{AdaptiveIntensity, IntensityDecision};
use super::ledger::CheckpointLedger;
use super::registry::{global_registry, HookPosition, PluginRegistry, RegistrySnapshot};
use super::result::PipelineResult;
use super::retry::{AttemptSummary, GraduatedRetry};
use super::validator::{QualityValidator, ValidationResult};
use crate::config::PipelineConfig;
use crate::core::{kinds, ChangeRecord, StageName, TextMetrics, PIPELINE_SOURCE};
use crate::errors::Result;
use crate::events::{event_types, EventSink, NoOpEventSink};
use crate::observability::SpanTimer;
use crate::oracles::{
    LanguageModelOracle, MetricsOracle, NoOpSpanProtector, NoOpWatermarkCleaner, SpanProtector,
    WatermarkCleaner,
};
use crate::stages::{
    apply_isolated, LanguageCapabilities, Stage, StageCatalog, StageDescriptor, StageRequest,
    StaticCapabilities,
};
use chrono::Utc;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Builder for [`PipelineExecutor`].
///
/// Everything except the stage catalog is optional. Without a metrics
/// oracle the adaptive controller and the artificiality check are inert;
/// without a language model the perplexity gate never fires.
#[derive(Default)]
pub struct ExecutorBuilder {
    catalog: StageCatalog,
    metrics: Option<Arc<dyn MetricsOracle>>,
    language_model: Option<Arc<dyn LanguageModelOracle>>,
    protector: Option<Arc<dyn SpanProtector>>,
    watermarks: Option<Arc<dyn WatermarkCleaner>>,
    capabilities: Option<Arc<dyn LanguageCapabilities>>,
    extensions: Option<RegistrySnapshot>,
    sink: Option<Arc<dyn EventSink>>,
}

impl ExecutorBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a stage implementation.
    #[must_use]
    pub fn stage(mut self, name: StageName, stage: Arc<dyn Stage>) -> Self {
        self.catalog.insert(name, stage);
        self
    }

    /// Replaces the whole catalog.
    #[must_use]
    pub fn catalog(mut self, catalog: StageCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Sets the artificiality scorer.
    #[must_use]
    pub fn metrics_oracle(mut self, oracle: Arc<dyn MetricsOracle>) -> Self {
        self.metrics = Some(oracle);
        self
    }

    /// Sets the perplexity estimator used by the regression gate.
    #[must_use]
    pub fn language_model(mut self, oracle: Arc<dyn LanguageModelOracle>) -> Self {
        self.language_model = Some(oracle);
        self
    }

    /// Sets the span protector.
    #[must_use]
    pub fn span_protector(mut self, protector: Arc<dyn SpanProtector>) -> Self {
        self.protector = Some(protector);
        self
    }

    /// Sets the watermark cleaner.
    #[must_use]
    pub fn watermark_cleaner(mut self, cleaner: Arc<dyn WatermarkCleaner>) -> Self {
        self.watermarks = Some(cleaner);
        self
    }

    /// Sets the language capability predicate.
    #[must_use]
    pub fn capabilities(mut self, capabilities: Arc<dyn LanguageCapabilities>) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Snapshots `registry` now. Later registrations are not seen.
    #[must_use]
    pub fn registry(mut self, registry: &PluginRegistry) -> Self {
        self.extensions = Some(registry.snapshot());
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the executor, snapshotting the process-wide registry if no
    /// registry was given.
    #[must_use]
    pub fn build(self) -> PipelineExecutor {
        PipelineExecutor {
            catalog: self.catalog,
            metrics: self.metrics,
            language_model: self.language_model,
            protector: self.protector.unwrap_or_else(|| Arc::new(NoOpSpanProtector)),
            watermarks: self.watermarks.unwrap_or_else(|| Arc::new(NoOpWatermarkCleaner)),
            capabilities: self
                .capabilities
                .unwrap_or_else(|| Arc::new(StaticCapabilities::default())),
            extensions: self
                .extensions
                .unwrap_or_else(|| global_registry().snapshot()),
            sink: self.sink.unwrap_or_else(|| Arc::new(NoOpEventSink)),
        }
    }
}

/// Runs the stage catalog over texts.
///
/// Immutable after construction; share it across threads with `Arc`.
pub struct PipelineExecutor {
    catalog: StageCatalog,
    metrics: Option<Arc<dyn MetricsOracle>>,
    language_model: Option<Arc<dyn LanguageModelOracle>>,
    protector: Arc<dyn SpanProtector>,
    watermarks: Arc<dyn WatermarkCleaner>,
    capabilities: Arc<dyn LanguageCapabilities>,
    extensions: RegistrySnapshot,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("catalog", &self.catalog)
            .field("has_metrics_oracle", &self.metrics.is_some())
            .field("has_language_model", &self.language_model.is_some())
            .field("protector", &self.protector)
            .field("watermarks", &self.watermarks)
            .field("capabilities", &self.capabilities)
            .field("extension_count", &self.extensions.len())
            .finish_non_exhaustive()
    }
}

/// Outcome of one attempt.
struct Attempt {
    text: String,
    changes: Vec<ChangeRecord>,
    decision: IntensityDecision,
    validation: ValidationResult,
}

impl Attempt {
    fn summary(&self, index: usize, factor: f64, requested: u8) -> AttemptSummary {
        AttemptSummary {
            attempt: index,
            factor,
            requested_intensity: requested,
            effective_intensity: self.decision.effective(),
            change_ratio: self.validation.change_ratio,
            artificiality_after: self
                .validation
                .metrics_after
                .as_ref()
                .map(|m| m.artificiality_score),
            critical_errors: self.validation.errors.len(),
            fast_path: self.decision.is_fast_path(),
        }
    }
}

/// Input-side state shared by every attempt of one call.
struct RunInput<'a> {
    text: &'a str,
    config: &'a PipelineConfig,
    metrics_before: Option<&'a TextMetrics>,
    oracle_note: Option<&'a ChangeRecord>,
}

impl PipelineExecutor {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::new()
    }

    /// The stage catalog.
    #[must_use]
    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    /// The extensions this executor runs.
    #[must_use]
    pub fn extensions(&self) -> &RegistrySnapshot {
        &self.extensions
    }

    /// The event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    /// Rewrites `text` under `config`.
    ///
    /// # Errors
    ///
    /// Only configuration errors (`config.validate()`). Stage and oracle
    /// failures are absorbed and recorded in the returned changes.
    pub fn run(&self, text: &str, config: &PipelineConfig) -> Result<PipelineResult> {
        config.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = SpanTimer::start(format!("pipeline:{run_id}"));

        if text.is_empty() {
            return Ok(PipelineResult {
                original: String::new(),
                text: String::new(),
                changes: Vec::new(),
                metrics_before: None,
                metrics_after: None,
                lang: config.lang.clone(),
                profile: config.profile,
                intensity: config.intensity,
                run_id,
                started_at,
                duration_ms: timer.finish(),
                attempts: Vec::new(),
                validation: None,
            });
        }

        info!(
            run_id = %run_id,
            lang = %config.lang,
            profile = %config.profile,
            intensity = config.intensity,
            chars = text.chars().count(),
            "Pipeline started"
        );
        self.sink.try_emit(
            event_types::PIPELINE_STARTED,
            Some(json!({
                "run_id": run_id.to_string(),
                "lang": config.lang,
                "profile": config.profile,
                "intensity": config.intensity,
            })),
        );

        let (metrics_before, oracle_note) = self.measure_input(text, &config.lang);
        let input = RunInput {
            text,
            config,
            metrics_before: metrics_before.as_ref(),
            oracle_note: oracle_note.as_ref(),
        };

        let retry = GraduatedRetry::new(&config.retry);
        let max_change_ratio = config.constraints.max_change_ratio;

        let first = self.run_attempt(&input, config.intensity);
        let mut summaries = vec![first.summary(0, 1.0, config.intensity)];
        let mut attempts = vec![first];

        if retry.needs_retry(&summaries[0], max_change_ratio) {
            for (factor, intensity) in retry.schedule(config.intensity) {
                let index = attempts.len();
                info!(
                    run_id = %run_id,
                    attempt = index,
                    factor,
                    intensity,
                    previous_change_ratio = summaries[index - 1].change_ratio,
                    "Change ratio over bound; retrying at reduced intensity"
                );
                self.sink.try_emit(
                    event_types::PIPELINE_RETRY,
                    Some(json!({
                        "run_id": run_id.to_string(),
                        "attempt": index,
                        "factor": factor,
                        "intensity": intensity,
                    })),
                );

                let attempt = self.run_attempt(&input, intensity);
                let summary = attempt.summary(index, factor, intensity);
                let done = !retry.needs_retry(&summary, max_change_ratio);
                summaries.push(summary);
                attempts.push(attempt);
                if done {
                    break;
                }
            }
        }

        let winner = retry.select(&summaries, max_change_ratio).unwrap_or(0);
        let mut attempt = attempts.swap_remove(winner);
        if winner > 0 {
            let summary = &summaries[winner];
            attempt.changes.push(
                ChangeRecord::new(PIPELINE_SOURCE, kinds::GRADUATED_RETRY).with_description(format!(
                    "kept attempt {winner} of {} at {}x intensity ({}); change ratio {:.3}",
                    summaries.len(),
                    summary.factor,
                    summary.requested_intensity,
                    summary.change_ratio
                )),
            );
        }

        let duration_ms = timer.finish();
        info!(
            run_id = %run_id,
            attempts = summaries.len(),
            winner,
            change_ratio = attempt.validation.change_ratio,
            changes = attempt.changes.len(),
            duration_ms,
            "Pipeline completed"
        );
        self.sink.try_emit(
            event_types::PIPELINE_COMPLETED,
            Some(json!({
                "run_id": run_id.to_string(),
                "attempts": summaries.len(),
                "winner": winner,
                "change_ratio": attempt.validation.change_ratio,
                "duration_ms": duration_ms,
            })),
        );

        Ok(PipelineResult {
            original: text.to_string(),
            text: attempt.text,
            changes: attempt.changes,
            metrics_before,
            metrics_after: attempt.validation.metrics_after.clone(),
            lang: config.lang.clone(),
            profile: config.profile,
            intensity: attempt.decision.effective(),
            run_id,
            started_at,
            duration_ms,
            attempts: summaries,
            validation: Some(attempt.validation),
        })
    }

    fn measure_input(&self, text: &str, lang: &str) -> (Option<TextMetrics>, Option<ChangeRecord>) {
        let Some(oracle) = self.metrics.as_deref() else {
            return (None, None);
        };
        match oracle.analyze(text, lang) {
            Ok(metrics) => (Some(metrics), None),
            Err(err) => {
                warn!(error = %err, "Input could not be scored; using configured intensity");
                let note = ChangeRecord::new(PIPELINE_SOURCE, kinds::ORACLE_UNAVAILABLE)
                    .with_description(err.to_string());
                (None, Some(note))
            }
        }
    }

    fn run_attempt(&self, input: &RunInput<'_>, requested: u8) -> Attempt {
        let config = input.config;
        let mut changes: Vec<ChangeRecord> = input.oracle_note.cloned().into_iter().collect();

        let decision = AdaptiveIntensity.decide(
            requested,
            input.metrics_before.map(|m| m.artificiality_score),
        );
        match decision {
            IntensityDecision::Run {
                requested,
                effective,
                score: Some(score),
                ..
            } if requested != effective => {
                debug!(requested, effective, score, "Intensity adjusted");
                changes.push(ChangeRecord::intensity_adjusted(requested, effective, score));
            }
            IntensityDecision::FastPath { score } => {
                info!(score, "Input already reads as natural; taking the fast path");
                changes.push(
                    ChangeRecord::new(PIPELINE_SOURCE, kinds::FAST_PATH).with_description(format!(
                        "artificiality score {score:.1}; semantic stages skipped"
                    )),
                );
                self.sink
                    .try_emit(event_types::PIPELINE_FAST_PATH, Some(json!({ "score": score })));
            }
            IntensityDecision::Run { .. } => {}
        }

        let report = self.watermarks.detect(input.text);
        if report.has_watermarks {
            changes.push(
                ChangeRecord::new(PIPELINE_SOURCE, kinds::WATERMARK)
                    .with_description(format!("removed: {}", report.kinds.join(", "))),
            );
        }
        let protected = self.protector.protect(&report.cleaned_text, &config.preservation);
        let mut ledger = CheckpointLedger::new(protected.text.clone());

        let base = StageRequest {
            stage: StageName::Typography,
            text: "",
            lang: &config.lang,
            profile: config.profile,
            intensity: if decision.is_fast_path() {
                requested
            } else {
                decision.effective()
            },
            seed: config.seed,
            target_style: config.target_style.as_ref(),
            substitutions: &config.substitutions,
        };

        let group_gated = !decision.is_fast_path() && !self.capabilities.has_resources(&config.lang);
        if group_gated {
            let skipped = self.catalog.gated_stages();
            if !skipped.is_empty() {
                info!(lang = %config.lang, stages = skipped.len(), "Language-resource stage group skipped");
                changes.push(ChangeRecord::group_skipped(&config.lang, &skipped));
                self.sink.try_emit(
                    event_types::STAGE_GROUP_SKIPPED,
                    Some(json!({ "lang": config.lang, "stages": skipped })),
                );
            }
        }

        let gate = PerplexityGate::new(self.language_model.as_deref(), &config.gate);
        let mut current = protected.text.clone();
        for descriptor in self.catalog.descriptors() {
            if decision.is_fast_path() && descriptor.name.is_semantic() {
                continue;
            }
            if group_gated && descriptor.requires_language_resources() {
                continue;
            }
            current = self.execute_stage(
                &descriptor,
                &base,
                current,
                &gate,
                &mut ledger,
                &mut changes,
            );
        }

        let validator = QualityValidator::new(
            self.metrics.as_deref(),
            &config.validator,
            &config.constraints,
            &config.lang,
        );
        let mut text = protected.restore(&current);
        let mut validation = validator.validate(input.text, &text, input.metrics_before);

        if validation.has_critical_errors() {
            let errors = validation.errors.join("; ");
            let clean = ledger
                .latest_clean(|candidate| {
                    candidate != current
                        && !validator
                            .validate(input.text, &protected.restore(candidate), input.metrics_before)
                            .has_critical_errors()
                })
                .map(|checkpoint| (checkpoint.stage, protected.restore(&checkpoint.text)));

            match clean {
                Some((stage, restored)) => {
                    warn!(stage = %stage, errors = %errors, "Partial rollback to last safe checkpoint");
                    changes.push(
                        ChangeRecord::new(PIPELINE_SOURCE, kinds::PARTIAL_ROLLBACK)
                            .with_description(format!("rolled back to checkpoint after {stage}: {errors}")),
                    );
                    self.sink.try_emit(
                        event_types::PIPELINE_ROLLBACK,
                        Some(json!({ "kind": kinds::PARTIAL_ROLLBACK, "stage": stage })),
                    );
                    text = restored;
                }
                None => {
                    warn!(errors = %errors, "No clean checkpoint; returning the original input");
                    changes.push(
                        ChangeRecord::new(PIPELINE_SOURCE, kinds::FULL_ROLLBACK)
                            .with_description(format!("no clean checkpoint: {errors}")),
                    );
                    self.sink.try_emit(
                        event_types::PIPELINE_ROLLBACK,
                        Some(json!({ "kind": kinds::FULL_ROLLBACK })),
                    );
                    text = input.text.to_string();
                }
            }
            validation = validator.validate(input.text, &text, input.metrics_before);
        }

        Attempt {
            text,
            changes,
            decision,
            validation,
        }
    }

    /// Runs one stage with its hooks, the gate and checkpointing; returns
    /// the text the next stage sees.
    fn execute_stage(
        &self,
        descriptor: &StageDescriptor,
        base: &StageRequest<'_>,
        text: String,
        gate: &PerplexityGate<'_>,
        ledger: &mut CheckpointLedger,
        changes: &mut Vec<ChangeRecord>,
    ) -> String {
        let name = descriptor.name;
        let request = StageRequest { stage: name, ..*base };
        let timer = SpanTimer::start(format!("stage:{name}"));

        let hooked = self
            .extensions
            .apply(HookPosition::Before, &request, text.clone(), changes);

        let outcome = match apply_isolated(descriptor.stage.as_ref(), &request.with_text(&hooked), name.as_str()) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(stage = %name, error = %err.message, "Stage failed; effect discarded");
                changes.push(ChangeRecord::stage_skipped(name, err.message.clone()));
                self.sink.try_emit(
                    event_types::STAGE_SKIPPED,
                    Some(json!({ "stage": name, "error": err.message })),
                );
                return text;
            }
        };
        let stage_changes = outcome.changes.len();
        changes.extend(outcome.changes);

        let mut after = self
            .extensions
            .apply(HookPosition::After, &request, outcome.text, changes);

        if name.is_gated_by_perplexity() {
            let pre_stage = ledger.latest_text();
            match gate.evaluate(pre_stage, &after) {
                GateVerdict::Rollback {
                    before,
                    after: ppl_after,
                    drop: ratio,
                } => {
                    warn!(stage = %name, before, after = ppl_after, drop = ratio, "Perplexity regression; stage undone");
                    changes.push(
                        ChangeRecord::new(name.as_str(), kinds::PERPLEXITY_ROLLBACK).with_description(format!(
                            "perplexity fell {:.0}% ({before:.1} -> {ppl_after:.1}); stage effect undone",
                            ratio * 100.0
                        )),
                    );
                    self.sink.try_emit(
                        event_types::GATE_ROLLBACK,
                        Some(json!({ "stage": name, "before": before, "after": ppl_after, "drop": ratio })),
                    );
                    after = pre_stage.to_string();
                }
                verdict => debug!(stage = %name, ?verdict, "Perplexity gate"),
            }
        }

        ledger.record(name, after.clone());
        let duration_ms = timer.finish();
        debug!(stage = %name, changes = stage_changes, duration_ms, "Stage completed");
        self.sink.try_emit(
            event_types::STAGE_COMPLETED,
            Some(json!({ "stage": name, "changes": stage_changes, "duration_ms": duration_ms })),
        );
        after
    }
}
