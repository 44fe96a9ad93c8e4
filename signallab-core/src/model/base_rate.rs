//! Constant predictor: the training up-rate for every row.

use crate::features::FeatureRow;
use crate::model::{check_training_set, ModelError, Predictor};

#[derive(Debug, Clone, Default)]
pub struct BaseRatePredictor {
    rate: Option<f64>,
}

impl BaseRatePredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate(&self) -> Option<f64> {
        self.rate
    }
}

impl Predictor for BaseRatePredictor {
    fn fit(&mut self, features: &[FeatureRow], labels: &[bool]) -> Result<(), ModelError> {
        check_training_set(features, labels)?;
        let up = labels.iter().filter(|&&y| y).count();
        self.rate = Some(up as f64 / labels.len() as f64);
        Ok(())
    }

    fn predict_probability(&self, features: &[FeatureRow]) -> Result<Vec<f64>, ModelError> {
        let rate = self.rate.ok_or(ModelError::NotFitted)?;
        Ok(vec![rate; features.len()])
    }
}
