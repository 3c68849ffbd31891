//! JSON persistence for the classifier and encoder artifacts.
//!
//! A model directory holds two files, written together by the trainer and
//! read together at service start:
//!
//! - [`MODEL_FILE`]: format version, training timestamp, feature names, and
//!   the serialized forest.
//! - [`ENCODERS_FILE`]: format version and the per-column category lists.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ckdrisk_core::FEATURE_COLUMNS;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ArtifactError, EncoderMapping, RandomForest};

pub const MODEL_FILE: &str = "ckd_model.json";
pub const ENCODERS_FILE: &str = "label_encoders.json";

/// Bumped whenever the on-disk layout of either artifact changes.
pub const FORMAT_VERSION: u32 = 1;

/// Classifier artifact as read from disk.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelFile {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    pub feature_names: Vec<String>,
    pub classifier: RandomForest,
}

#[derive(Serialize)]
struct ModelFileRef<'a> {
    format_version: u32,
    trained_at: DateTime<Utc>,
    feature_names: &'a [&'static str],
    classifier: &'a RandomForest,
}

/// Encoder artifact as read from disk.
#[derive(Debug, Clone, Deserialize)]
pub struct EncodersFile {
    pub format_version: u32,
    pub encoders: EncoderMapping,
}

#[derive(Serialize)]
struct EncodersFileRef<'a> {
    format_version: u32,
    encoders: &'a EncoderMapping,
}

pub fn model_path(model_dir: &Path) -> PathBuf {
    model_dir.join(MODEL_FILE)
}

pub fn encoders_path(model_dir: &Path) -> PathBuf {
    model_dir.join(ENCODERS_FILE)
}

/// Write both artifacts into `model_dir`, creating it if needed.
pub fn save_all(
    model_dir: &Path,
    classifier: &RandomForest,
    encoders: &EncoderMapping,
    trained_at: DateTime<Utc>,
) -> Result<(), ArtifactError> {
    std::fs::create_dir_all(model_dir).map_err(|source| ArtifactError::Io {
        path: model_dir.to_path_buf(),
        source,
    })?;
    save_classifier(&model_path(model_dir), classifier, trained_at)?;
    save_encoders(&encoders_path(model_dir), encoders)?;
    Ok(())
}

pub fn save_classifier(
    path: &Path,
    classifier: &RandomForest,
    trained_at: DateTime<Utc>,
) -> Result<(), ArtifactError> {
    let file = ModelFileRef {
        format_version: FORMAT_VERSION,
        trained_at,
        feature_names: &FEATURE_COLUMNS,
        classifier,
    };
    write_json(path, &file, false)?;
    info!(path = %path.display(), trees = classifier.n_trees(), "saved classifier");
    Ok(())
}

pub fn save_encoders(path: &Path, encoders: &EncoderMapping) -> Result<(), ArtifactError> {
    let file = EncodersFileRef {
        format_version: FORMAT_VERSION,
        encoders,
    };
    write_json(path, &file, true)?;
    info!(path = %path.display(), "saved label encoders");
    Ok(())
}

/// Read and check the classifier artifact.
///
/// The stored feature names must equal the fixed schema order and the forest
/// must be structurally sound.
pub fn load_classifier(path: &Path) -> Result<ModelFile, ArtifactError> {
    let file: ModelFile = read_json(path)?;
    check_version(path, file.format_version)?;

    if file.feature_names != FEATURE_COLUMNS {
        return Err(mismatch(
            path,
            format!(
                "feature names {:?} do not match schema {:?}",
                file.feature_names, FEATURE_COLUMNS
            ),
        ));
    }
    if file.classifier.n_features() != FEATURE_COLUMNS.len() {
        return Err(mismatch(
            path,
            format!(
                "classifier expects {} features, schema has {}",
                file.classifier.n_features(),
                FEATURE_COLUMNS.len()
            ),
        ));
    }
    file.classifier
        .validate()
        .map_err(|detail| mismatch(path, detail))?;

    info!(
        path = %path.display(),
        trees = file.classifier.n_trees(),
        trained_at = %file.trained_at,
        "loaded classifier"
    );
    Ok(file)
}

/// Read and check the encoder artifact.
pub fn load_encoders(path: &Path) -> Result<EncoderMapping, ArtifactError> {
    let file: EncodersFile = read_json(path)?;
    check_version(path, file.format_version)?;
    if let Some(column) = file.encoders.first_malformed() {
        return Err(mismatch(
            path,
            format!("encoder for '{column}' is empty, unsorted, or has duplicates"),
        ));
    }
    info!(path = %path.display(), "loaded label encoders");
    Ok(file.encoders)
}

fn check_version(path: &Path, found: u32) -> Result<(), ArtifactError> {
    if found != FORMAT_VERSION {
        return Err(mismatch(
            path,
            format!("format version {found}, expected {FORMAT_VERSION}"),
        ));
    }
    Ok(())
}

fn mismatch(path: &Path, detail: String) -> ArtifactError {
    ArtifactError::SchemaMismatch {
        path: path.to_path_buf(),
        detail,
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<(), ArtifactError> {
    let io_err = |source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    let result = if pretty {
        serde_json::to_writer_pretty(&mut writer, value)
    } else {
        serde_json::to_writer(&mut writer, value)
    };
    result.map_err(|source| ArtifactError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ArtifactError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}
