// Prediction pipeline: bundle loading, feature normalization, model evaluation.
// Handlers and the assistant go through `registry::ModelRegistry::predict`.

pub mod advance;
pub mod bundle;
pub mod embedding;
pub mod estimator;
pub mod fit;
pub mod handlers;
pub mod normalizer;
pub mod predictor;
pub mod registry;

#[cfg(test)]
pub mod testing;
