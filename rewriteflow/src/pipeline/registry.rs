//! Plugin and hook registry.
//!
//! Extensions are registered against a stage name and a position. Executors
//! never read the registry while running: they take a [`RegistrySnapshot`]
//! at construction and only ever see what was registered before that.

use crate::config::Profile;
use crate::core::{plugin_source, ChangeRecord, StageName};
use crate::errors::{Result, RewriteflowError};
use crate::stages::{apply_isolated, catch_panic, Stage, StageRequest};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Where an extension runs relative to its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPosition {
    /// Before the stage, on its input.
    Before,
    /// After the stage, on its output.
    After,
}

impl HookPosition {
    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl fmt::Display for HookPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookPosition {
    type Err = RewriteflowError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            other => Err(RewriteflowError::InvalidConstraint(format!(
                "hook position must be 'before' or 'after', got '{other}'"
            ))),
        }
    }
}

/// What a hook can see about the stage it is attached to.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// The stage.
    pub stage: StageName,
    /// Before or after.
    pub position: HookPosition,
    /// Language code.
    pub lang: &'a str,
    /// Style profile.
    pub profile: Profile,
    /// Effective intensity.
    pub intensity: u8,
}

/// A pure text transform spliced around a stage.
pub type Hook = Arc<dyn Fn(&str, &HookContext<'_>) -> String + Send + Sync>;

/// A registered extension.
#[derive(Clone)]
pub enum Extension {
    /// Text-only hook; produces no change records.
    Hook(Hook),
    /// A full stage run in the isolation boundary.
    Plugin(Arc<dyn Stage>),
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hook(_) => f.write_str("Hook"),
            Self::Plugin(stage) => f.debug_tuple("Plugin").field(stage).finish(),
        }
    }
}

type ExtensionMap = BTreeMap<(StageName, HookPosition), Vec<Extension>>;

/// Shared, mutable registry of extensions.
///
/// Registration is synchronized; any number of threads may register at
/// once.
#[derive(Default)]
pub struct PluginRegistry {
    extensions: RwLock<ExtensionMap>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook against a stage given by name.
    ///
    /// # Errors
    ///
    /// `UnknownStage` if `stage` is not in the stage enumeration.
    pub fn register_hook<F>(&self, stage: &str, position: HookPosition, hook: F) -> Result<()>
    where
        F: Fn(&str, &HookContext<'_>) -> String + Send + Sync + 'static,
    {
        let stage = StageName::from_str(stage)?;
        self.add_hook(stage, position, hook);
        Ok(())
    }

    /// Registers a plugin stage against a stage given by name.
    ///
    /// # Errors
    ///
    /// `UnknownStage` if `stage` is not in the stage enumeration.
    pub fn register_plugin(
        &self,
        stage: &str,
        position: HookPosition,
        plugin: Arc<dyn Stage>,
    ) -> Result<()> {
        let stage = StageName::from_str(stage)?;
        self.add_plugin(stage, position, plugin);
        Ok(())
    }

    /// Registers a hook against a typed stage name.
    pub fn add_hook<F>(&self, stage: StageName, position: HookPosition, hook: F)
    where
        F: Fn(&str, &HookContext<'_>) -> String + Send + Sync + 'static,
    {
        self.push(stage, position, Extension::Hook(Arc::new(hook)));
    }

    /// Registers a plugin against a typed stage name.
    pub fn add_plugin(&self, stage: StageName, position: HookPosition, plugin: Arc<dyn Stage>) {
        self.push(stage, position, Extension::Plugin(plugin));
    }

    fn push(&self, stage: StageName, position: HookPosition, extension: Extension) {
        tracing::debug!(stage = %stage, position = %position, "Registered extension");
        self.extensions
            .write()
            .entry((stage, position))
            .or_default()
            .push(extension);
    }

    /// Removes every hook and plugin.
    pub fn clear_plugins(&self) {
        self.extensions.write().clear();
    }

    /// Returns the number of registered extensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.read().values().map(Vec::len).sum()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the current registrations into an immutable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            extensions: Arc::new(self.extensions.read().clone()),
        }
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("extension_count", &self.len())
            .finish()
    }
}

/// Immutable copy of a registry, owned by one executor.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    extensions: Arc<ExtensionMap>,
}

impl RegistrySnapshot {
    /// Extensions for `(stage, position)` in registration order.
    #[must_use]
    pub fn extensions(&self, stage: StageName, position: HookPosition) -> &[Extension] {
        self.extensions
            .get(&(stage, position))
            .map_or(&[], Vec::as_slice)
    }

    /// Returns the number of extensions in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.extensions.values().map(Vec::len).sum()
    }

    /// Returns true if the snapshot holds no extensions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Threads `text` through the extensions at `position` of
    /// `request.stage`.
    ///
    /// Each extension is isolated: a failing plugin or panicking hook is
    /// skipped with a `plugin_skipped` record and the text it received is
    /// passed on unchanged.
    pub fn apply(
        &self,
        position: HookPosition,
        request: &StageRequest<'_>,
        text: String,
        changes: &mut Vec<ChangeRecord>,
    ) -> String {
        let stage = request.stage;
        let label = plugin_source(stage);
        let context = HookContext {
            stage,
            position,
            lang: request.lang,
            profile: request.profile,
            intensity: request.intensity,
        };

        self.extensions(stage, position)
            .iter()
            .fold(text, |text, extension| match extension {
                Extension::Hook(hook) => match catch_panic(&label, || hook(&text, &context)) {
                    Ok(next) => next,
                    Err(err) => {
                        tracing::warn!(stage = %stage, position = %position, error = %err, "Hook skipped");
                        changes.push(ChangeRecord::plugin_skipped(stage, err.message));
                        text
                    }
                },
                Extension::Plugin(plugin) => {
                    match apply_isolated(plugin.as_ref(), &request.with_text(&text), &label) {
                        Ok(outcome) => {
                            changes.extend(outcome.changes.into_iter().map(|mut change| {
                                change.stage.clone_from(&label);
                                change
                            }));
                            outcome.text
                        }
                        Err(err) => {
                            tracing::warn!(stage = %stage, position = %position, error = %err, "Plugin skipped");
                            changes.push(ChangeRecord::plugin_skipped(stage, err.message));
                            text
                        }
                    }
                }
            })
    }
}

static GLOBAL_REGISTRY: RwLock<Option<Arc<PluginRegistry>>> = RwLock::new(None);

/// Returns the process-wide registry, creating it on first use.
pub fn global_registry() -> Arc<PluginRegistry> {
    if let Some(registry) = GLOBAL_REGISTRY.read().as_ref() {
        return Arc::clone(registry);
    }
    let mut write = GLOBAL_REGISTRY.write();
    Arc::clone(write.get_or_insert_with(|| Arc::new(PluginRegistry::new())))
}

/// Registers a hook in the process-wide registry.
///
/// # Errors
///
/// `UnknownStage` if `stage` is not in the stage enumeration.
pub fn register_hook<F>(stage: &str, position: HookPosition, hook: F) -> Result<()>
where
    F: Fn(&str, &HookContext<'_>) -> String + Send + Sync + 'static,
{
    global_registry().register_hook(stage, position, hook)
}

/// Registers a plugin in the process-wide registry.
///
/// # Errors
///
/// `UnknownStage` if `stage` is not in the stage enumeration.
pub fn register_plugin(stage: &str, position: HookPosition, plugin: Arc<dyn Stage>) -> Result<()> {
    global_registry().register_plugin(stage, position, plugin)
}

/// Clears the process-wide registry.
pub fn clear_plugins() {
    global_registry().clear_plugins();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageError;
    use crate::stages::{FnStage, StageOutcome};
    use std::thread;

    fn request<'a>(stage: StageName, subs: &'a BTreeMap<String, String>) -> StageRequest<'a> {
        StageRequest {
            stage,
            text: "",
            lang: "en",
            profile: Profile::Web,
            intensity: 50,
            seed: Some(1),
            target_style: None,
            substitutions: subs,
        }
    }

    #[test]
    fn test_unknown_stage_is_rejected_at_registration() {
        let registry = PluginRegistry::new();
        let err = registry
            .register_hook("spellcheck", HookPosition::Before, |t, _| t.to_string())
            .unwrap_err();
        assert!(matches!(err, RewriteflowError::UnknownStage { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let registry = PluginRegistry::new();
        registry
            .register_hook("universal", HookPosition::Before, |t, _| format!("{t}a"))
            .unwrap();
        registry
            .register_hook("universal", HookPosition::Before, |t, _| format!("{t}b"))
            .unwrap();
        registry
            .register_hook("universal", HookPosition::After, |t, _| format!("{t}!"))
            .unwrap();

        let snapshot = registry.snapshot();
        let subs = BTreeMap::new();
        let req = request(StageName::Universal, &subs);
        let mut changes = Vec::new();

        let text = snapshot.apply(HookPosition::Before, &req, "x".to_string(), &mut changes);
        assert_eq!(text, "xab");
        let text = snapshot.apply(HookPosition::After, &req, text, &mut changes);
        assert_eq!(text, "xab!");
        assert!(changes.is_empty());

        let other = request(StageName::Typography, &subs);
        assert_eq!(
            snapshot.apply(HookPosition::Before, &other, "x".to_string(), &mut changes),
            "x"
        );
    }

    #[test]
    fn test_hook_context() {
        let registry = PluginRegistry::new();
        registry.add_hook(StageName::Readability, HookPosition::After, |t, ctx| {
            format!("{t}:{}:{}:{}", ctx.stage, ctx.position, ctx.lang)
        });
        let subs = BTreeMap::new();
        let mut changes = Vec::new();
        let text = registry.snapshot().apply(
            HookPosition::After,
            &request(StageName::Readability, &subs),
            "t".to_string(),
            &mut changes,
        );
        assert_eq!(text, "t:readability:after:en");
    }

    #[test]
    fn test_plugin_records_are_attributed() {
        let registry = PluginRegistry::new();
        let plugin = FnStage::new("brand", |req: &StageRequest<'_>| {
            Ok(StageOutcome::unchanged(req.text.replace("acme", "Acme"))
                .with_change(ChangeRecord::replacement("brand", "brand_case", "acme", "Acme")))
        });
        registry
            .register_plugin("paraphrase", HookPosition::After, Arc::new(plugin))
            .unwrap();

        let subs = BTreeMap::new();
        let mut changes = Vec::new();
        let text = registry.snapshot().apply(
            HookPosition::After,
            &request(StageName::Paraphrase, &subs),
            "acme rocks".to_string(),
            &mut changes,
        );
        assert_eq!(text, "Acme rocks");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].stage, "plugin:paraphrase");
    }

    #[test]
    fn test_failing_extensions_are_isolated() {
        let registry = PluginRegistry::new();
        registry.add_plugin(
            StageName::Universal,
            HookPosition::Before,
            Arc::new(FnStage::new("broken", |_req: &StageRequest<'_>| {
                Err(StageError::new("broken", "boom"))
            })),
        );
        registry.add_hook(StageName::Universal, HookPosition::Before, |_, _| panic!("hook bug"));
        registry.add_hook(StageName::Universal, HookPosition::Before, |t, _| t.to_uppercase());

        let subs = BTreeMap::new();
        let mut changes = Vec::new();
        let text = registry.snapshot().apply(
            HookPosition::Before,
            &request(StageName::Universal, &subs),
            "keep".to_string(),
            &mut changes,
        );
        assert_eq!(text, "KEEP");
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.kind == crate::core::kinds::PLUGIN_SKIPPED));
    }

    #[test]
    fn test_snapshot_ignores_later_registrations() {
        let registry = PluginRegistry::new();
        registry.add_hook(StageName::Universal, HookPosition::Before, |t, _| t.to_string());
        let snapshot = registry.snapshot();

        registry.add_hook(StageName::Universal, HookPosition::Before, |t, _| t.to_string());
        registry.clear_plugins();

        assert_eq!(snapshot.len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(PluginRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..25 {
                        registry
                            .register_hook("naturalize", HookPosition::After, |t, _| t.to_string())
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 200);
        assert_eq!(
            registry
                .snapshot()
                .extensions(StageName::Naturalize, HookPosition::After)
                .len(),
            200
        );
    }

    #[test]
    fn test_hook_position_parse() {
        assert_eq!("Before".parse::<HookPosition>().unwrap(), HookPosition::Before);
        assert!("around".parse::<HookPosition>().is_err());
    }

    #[test]
    fn test_global_registry_is_shared() {
        assert!(Arc::ptr_eq(&global_registry(), &global_registry()));
        assert!(register_hook("no_such_stage", HookPosition::After, |t, _| t.to_string()).is_err());
    }
}
