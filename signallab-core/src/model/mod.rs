//! Predictors: anything that can be trained on feature rows and then produce an
//! up-move probability per row.
//!
//! The pipeline only sees the `Predictor` trait, so a different model can be
//! swapped in without touching the dataset, signal or simulator stages.

pub mod base_rate;
pub mod logistic;
pub mod scaler;

use thiserror::Error;

use crate::features::FeatureRow;

pub use base_rate::BaseRatePredictor;
pub use logistic::{LogisticConfig, LogisticRegression};
pub use scaler::StandardScaler;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("{features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },

    #[error("training labels contain a single class")]
    SingleClass,

    #[error("predict called before fit")]
    NotFitted,

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("normal equations are singular at iteration {0}")]
    Singular(usize),
}

/// Two-operation model contract. Implementations must be deterministic for
/// fixed input.
pub trait Predictor: Send + Sync {
    fn fit(&mut self, features: &[FeatureRow], labels: &[bool]) -> Result<(), ModelError>;

    /// One probability in [0, 1] per input row, in input order.
    fn predict_probability(&self, features: &[FeatureRow]) -> Result<Vec<f64>, ModelError>;
}

/// Checks shared by every `fit` implementation.
pub(crate) fn check_training_set(
    features: &[FeatureRow],
    labels: &[bool],
) -> Result<(), ModelError> {
    if features.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }
    if features.len() != labels.len() {
        return Err(ModelError::LengthMismatch {
            features: features.len(),
            labels: labels.len(),
        });
    }
    if !features.iter().all(FeatureRow::is_finite) {
        return Err(ModelError::NonFinite("training features"));
    }
    Ok(())
}
