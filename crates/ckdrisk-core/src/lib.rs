pub mod record;
pub mod schema;

pub use record::{FeatureRecord, RecordError};
pub use schema::{CATEGORICAL_COLUMNS, FEATURE_COLUMNS, N_FEATURES, NUMERIC_COLUMNS};
