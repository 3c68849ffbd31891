//! Inference context: the loaded classifier and encoders behind one type.
//!
//! A [`RiskModel`] is built once at process start and shared read-only by
//! every request. It never reloads or mutates itself.

use std::path::Path;

use ckdrisk_core::{FeatureRecord, N_FEATURES};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifact;
use crate::forest::class_of;
use crate::{EncoderMapping, ModelError, RandomForest};

/// Binary risk outcome. Class 1 is elevated risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    Low,
    Elevated,
}

impl RiskLabel {
    pub fn from_class(class: u8) -> Self {
        if class == 1 { Self::Elevated } else { Self::Low }
    }

    pub fn class_index(&self) -> usize {
        match self {
            Self::Low => 0,
            Self::Elevated => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Elevated => "elevated",
        }
    }

    /// Human-readable result line shown by the form.
    pub fn headline(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk of Chronic Kidney Disease",
            Self::Elevated => "High Risk of Chronic Kidney Disease",
        }
    }
}

/// Result of a single prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: RiskLabel,
    /// Probability assigned to `label`.
    pub confidence: f64,
    /// `[p(low), p(elevated)]`.
    pub probabilities: [f64; 2],
}

/// Loaded classifier + encoder mapping.
#[derive(Debug, Clone)]
pub struct RiskModel {
    classifier: RandomForest,
    encoders: EncoderMapping,
}

impl RiskModel {
    /// Load both artifacts from `model_dir`.
    ///
    /// Fails if either file is missing, unreadable, or built for a different
    /// feature schema. There is no fallback model.
    pub fn load(model_dir: &Path) -> Result<Self, ModelError> {
        let model = artifact::load_classifier(&artifact::model_path(model_dir))?;
        let encoders = artifact::load_encoders(&artifact::encoders_path(model_dir))?;
        Self::from_parts(model.classifier, encoders)
    }

    pub fn from_parts(classifier: RandomForest, encoders: EncoderMapping) -> Result<Self, ModelError> {
        if classifier.n_features() != N_FEATURES {
            return Err(ModelError::FeatureCount {
                expected: N_FEATURES,
                got: classifier.n_features(),
            });
        }
        Ok(Self {
            classifier,
            encoders,
        })
    }

    /// Encode `record`, run the forest, and pick the winning class.
    ///
    /// Numeric ranges are not checked here; see [`FeatureRecord::validate`].
    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction, ModelError> {
        let row = self.encoders.encode(record)?;
        let probabilities = self.classifier.predict_proba(&row)?;
        let label = RiskLabel::from_class(class_of(probabilities));
        let confidence = probabilities[label.class_index()];
        debug!(label = label.as_str(), confidence, "prediction");
        Ok(Prediction {
            label,
            confidence,
            probabilities,
        })
    }

    pub fn classifier(&self) -> &RandomForest {
        &self.classifier
    }

    pub fn encoders(&self) -> &EncoderMapping {
        &self.encoders
    }

    /// Persist this model into `model_dir`.
    pub fn save(&self, model_dir: &Path) -> Result<(), ModelError> {
        artifact::save_all(
            model_dir,
            &self.classifier,
            &self.encoders,
            chrono::Utc::now(),
        )?;
        Ok(())
    }
}
