//! Web front end for ckdrisk: an HTML form and a JSON API over one
//! [`RiskModel`] loaded at startup.

mod error;
mod handlers;
pub mod page;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use ckdrisk_core::FeatureRecord;
use ckdrisk_model::{Prediction, RiskModel};
use tracing::info;

pub use error::ApiError;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8501";
pub const DEFAULT_MODEL_DIR: &str = "models";

/// Settings for [`serve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    pub listen: String,
    pub model_dir: PathBuf,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
        }
    }
}

/// Shared, read-only request state.
#[derive(Debug)]
pub struct AppState {
    pub model: RiskModel,
}

impl AppState {
    pub fn new(model: RiskModel) -> Self {
        Self { model }
    }

    /// Range-check `record`, then run the model.
    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction, ApiError> {
        record.validate()?;
        Ok(self.model.predict(record)?)
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/predict", post(handlers::predict_form))
        .route("/api/predict", post(handlers::predict_json))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Load the model artifacts and serve until the process is stopped.
///
/// A missing or unreadable artifact is fatal: nothing is bound and the
/// error is returned to the caller.
pub async fn serve(config: ServeConfig) -> anyhow::Result<()> {
    let model = RiskModel::load(&config.model_dir).with_context(|| {
        format!(
            "loading model artifacts from {}",
            config.model_dir.display()
        )
    })?;
    info!(
        model_dir = %config.model_dir.display(),
        trees = model.classifier().n_trees(),
        "model loaded"
    );

    let app = build_router(Arc::new(AppState::new(model)));
    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    info!(listen = %config.listen, "ckdrisk form listening");
    axum::serve(listener, app).await?;
    Ok(())
}
