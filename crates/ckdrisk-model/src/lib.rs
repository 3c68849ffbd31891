//! Model layer: categorical encoders, a seeded random-forest classifier,
//! the offline trainer, artifact persistence, and the inference context.

pub mod artifact;
pub mod dataset;
pub mod encoder;
mod error;
pub mod forest;
pub mod predictor;
pub mod trainer;
pub mod tree;

pub use artifact::{ENCODERS_FILE, MODEL_FILE};
pub use encoder::{EncoderMapping, LabelEncoder};
pub use error::{ArtifactError, EncodeError, ModelError};
pub use forest::{ForestParams, RandomForest};
pub use predictor::{Prediction, RiskLabel, RiskModel};
pub use trainer::{TrainConfig, TrainReport, TrainedModel};
