//! The ordered list of stage descriptors an executor runs.

use super::Stage;
use crate::core::StageName;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A stage name bound to its implementation.
#[derive(Debug, Clone)]
pub struct StageDescriptor {
    /// Stage identity.
    pub name: StageName,
    /// Implementation.
    pub stage: Arc<dyn Stage>,
}

impl StageDescriptor {
    /// Returns true if this stage belongs to the language-resource group.
    #[must_use]
    pub fn requires_language_resources(&self) -> bool {
        self.name.requires_language_resources()
    }
}

/// Implementations keyed by stage name, iterated in pipeline order.
///
/// Names without an implementation are simply absent from a run.
#[derive(Debug, Clone, Default)]
pub struct StageCatalog {
    stages: BTreeMap<StageName, Arc<dyn Stage>>,
}

impl StageCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds an implementation, replacing any previous one.
    #[must_use]
    pub fn with_stage(mut self, name: StageName, stage: Arc<dyn Stage>) -> Self {
        self.insert(name, stage);
        self
    }

    /// Binds an implementation, replacing any previous one.
    pub fn insert(&mut self, name: StageName, stage: Arc<dyn Stage>) {
        self.stages.insert(name, stage);
    }

    /// Returns the implementation for `name`.
    #[must_use]
    pub fn get(&self, name: StageName) -> Option<&Arc<dyn Stage>> {
        self.stages.get(&name)
    }

    /// Returns the descriptors in execution order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<StageDescriptor> {
        self.stages
            .iter()
            .map(|(name, stage)| StageDescriptor {
                name: *name,
                stage: Arc::clone(stage),
            })
            .collect()
    }

    /// Returns the bound stages that need language resources.
    #[must_use]
    pub fn gated_stages(&self) -> Vec<StageName> {
        self.stages
            .keys()
            .copied()
            .filter(|name| name.requires_language_resources())
            .collect()
    }

    /// Returns the number of bound stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if no stage is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::PassthroughStage;

    #[test]
    fn test_descriptors_follow_pipeline_order() {
        let catalog = StageCatalog::new()
            .with_stage(StageName::CoherenceRepair, Arc::new(PassthroughStage))
            .with_stage(StageName::Typography, Arc::new(PassthroughStage))
            .with_stage(StageName::Naturalize, Arc::new(PassthroughStage));

        let names: Vec<_> = catalog.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![StageName::Typography, StageName::Naturalize, StageName::CoherenceRepair]
        );
    }

    #[test]
    fn test_gated_stages() {
        let catalog = StageCatalog::new()
            .with_stage(StageName::Paraphrase, Arc::new(PassthroughStage))
            .with_stage(StageName::Universal, Arc::new(PassthroughStage));
        assert_eq!(catalog.gated_stages(), vec![StageName::Paraphrase]);
        assert_eq!(catalog.len(), 2);
        assert!(!catalog.is_empty());
    }

    #[test]
    fn test_insert_replaces() {
        let mut catalog = StageCatalog::new();
        catalog.insert(StageName::Universal, Arc::new(PassthroughStage));
        catalog.insert(StageName::Universal, Arc::new(PassthroughStage));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(StageName::Universal).is_some());
        assert!(catalog.get(StageName::Readability).is_none());
    }
}
