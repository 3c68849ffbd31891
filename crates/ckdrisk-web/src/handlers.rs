use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::Html;
use ckdrisk_core::FeatureRecord;
use ckdrisk_model::Prediction;
use serde_json::{Value, json};

use crate::page::{self, FormInput, Outcome};
use crate::{ApiError, AppState};

pub async fn index() -> Html<String> {
    Html(page::render(&FormInput::default(), None))
}

pub async fn predict_form(
    State(state): State<Arc<AppState>>,
    form: Result<Form<FormInput>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let input = match form {
        Ok(Form(input)) => input,
        Err(rejection) => {
            let err = ApiError::Rejected(rejection.body_text());
            err.log();
            let outcome = Outcome::Error(err.public_message());
            return (
                err.status(),
                Html(page::render(&FormInput::default(), Some(&outcome))),
            );
        }
    };

    let result = input
        .to_record()
        .and_then(|record| state.predict(&record));
    match result {
        Ok(prediction) => (
            StatusCode::OK,
            Html(page::render(&input, Some(&Outcome::Prediction(prediction)))),
        ),
        Err(err) => {
            err.log();
            let outcome = Outcome::Error(err.public_message());
            (err.status(), Html(page::render(&input, Some(&outcome))))
        }
    }
}

pub async fn predict_json(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FeatureRecord>, JsonRejection>,
) -> Result<Json<Prediction>, ApiError> {
    let Json(record) = payload.map_err(|rejection| ApiError::Rejected(rejection.body_text()))?;
    Ok(Json(state.predict(&record)?))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "trees": state.model.classifier().n_trees(),
    }))
}
