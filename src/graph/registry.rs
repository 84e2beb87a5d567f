//! Stage type registry.
//!
//! Maps stage type names to constructors so serialized graph descriptions
//! can be instantiated. [`StageRegistry::with_builtins`] registers every
//! stage this crate ships; embedders may add their own types on top.

use std::collections::BTreeMap;

use crate::error::{PipelineError, Result};
use crate::stages;

use super::stage::StageImpl;

type Factory = fn() -> Box<dyn StageImpl>;

pub struct StageRegistry {
    factories: BTreeMap<&'static str, Factory>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry pre-populated with all built-in stage types.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register("video_input", || Box::new(stages::VideoInput));
        reg.register("grayscale", || Box::new(stages::Grayscale));
        reg.register("gaussian_blur", || Box::new(stages::GaussianBlur));
        reg.register("adaptive_threshold", || Box::new(stages::AdaptiveThreshold));
        reg.register("morphology", || Box::new(stages::Morphology));
        reg.register("contour_extract", || Box::new(stages::ContourExtract));
        reg.register("size_filter", || Box::new(stages::SizeFilter));
        reg.register("draw_contours", || Box::new(stages::DrawContours));
        reg.register("feature_extract", || Box::new(stages::FeatureExtract));
        reg.register("image_output", || Box::new(stages::ImageOutput));
        reg.register("data_output", || Box::new(stages::DataOutput));
        reg
    }

    pub fn register(&mut self, type_name: &'static str, factory: Factory) {
        self.factories.insert(type_name, factory);
    }

    pub fn instantiate(&self, type_name: &str) -> Result<Box<dyn StageImpl>> {
        self.factories
            .get(type_name)
            .map(|f| f())
            .ok_or_else(|| PipelineError::UnknownStageType(type_name.to_string()))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
