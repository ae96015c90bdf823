//! Main Kiln struct and public API.

use std::path::Path;

use crate::config::KilnConfig;
use crate::error::Result;
use crate::input::DataTable;
use crate::model::{self, ModelBundle, TrainedModel};
use crate::registry::TransformRegistry;
use crate::state::DatasetState;
use crate::transform::{
    ApplyReport, ColumnSession, Confirm, NullRemoval, SurveyPipeline, TransformContext,
};

/// Ties together configuration, the transform registry and the model
/// surface. The dataset itself lives in a [`DatasetState`] owned by the
/// caller and is only mutated through a [`ColumnSession`].
pub struct Kiln {
    config: KilnConfig,
    registry: TransformRegistry,
}

impl Kiln {
    /// Open the transform store named by the configuration.
    pub fn new(config: KilnConfig) -> Result<Self> {
        let registry = TransformRegistry::open(&config.store_path)?;
        Ok(Self { config, registry })
    }

    /// Default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(KilnConfig::default())
    }

    pub fn config(&self) -> &KilnConfig {
        &self.config
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    /// Mutable registry access for add, edit and delete.
    pub fn registry_mut(&mut self) -> &mut TransformRegistry {
        &mut self.registry
    }

    /// Load a training dataset.
    pub fn open_dataset(&self, path: impl AsRef<Path>) -> Result<DatasetState> {
        DatasetState::open(path, &self.config.parser, self.config.dataset.clone())
    }

    /// Context in which transforms run, resolving nested calls through
    /// the registry.
    pub fn context(&self) -> TransformContext<'_> {
        TransformContext::new(&self.config.transforms).with_resolver(&self.registry)
    }

    /// Apply a transform by name to the session column.
    pub fn apply(&self, session: &mut ColumnSession<'_>, spec: &str) -> Result<ApplyReport> {
        let transform = self.registry.resolve(spec)?;
        session.apply(transform.as_ref(), &self.context())
    }

    /// Remove rows missing a value in the session column, after
    /// confirmation.
    pub fn remove_nulls(
        &self,
        session: &mut ColumnSession<'_>,
        confirm: &mut dyn Confirm,
    ) -> Result<NullRemoval> {
        session.remove_nulls(&self.context(), confirm)
    }

    /// Run the survey pipeline on a copy of a table.
    pub fn run_survey(&self, table: &DataTable) -> Result<DataTable> {
        SurveyPipeline::new(self.config.survey.clone()).run(&self.context(), table)
    }

    /// Train on the selected columns.
    pub fn train(&self, state: &DatasetState) -> Result<TrainedModel> {
        model::train(state, &self.config.model)
    }

    /// Train and save a bundle into `dir`.
    pub fn train_and_save(
        &self,
        state: &DatasetState,
        dir: impl AsRef<Path>,
    ) -> Result<(ModelBundle, model::TrainingMetrics)> {
        let trained = self.train(state)?;
        let metrics = trained.metrics;
        let bundle = ModelBundle::new(trained, state);
        bundle.save(dir)?;
        Ok((bundle, metrics))
    }
}
