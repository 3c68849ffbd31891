//! Training tables: raw labelled records and the dense encoded matrix.

use ckdrisk_core::FeatureRecord;
use ckdrisk_core::schema::CATEGORICAL_FIELDS;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::{EncoderMapping, ModelError};

/// A raw record paired with its binary target (1 = CKD).
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledRecord {
    pub record: FeatureRecord,
    pub target: u8,
}

/// Generate a uniformly random table shaped like the clinical schema.
///
/// Numeric draws: `age` in [20, 80), `bp` in [60, 180), `sg` in
/// [1.005, 1.025), `al` and `su` in [0, 6). Categorical columns pick one of
/// their two form options; the target is a fair coin. The target carries no
/// signal, so a model fit on this table only exercises the mechanics.
pub fn synthetic_table(n_rows: usize, rng: &mut StdRng) -> Vec<LabelledRecord> {
    (0..n_rows)
        .map(|_| {
            let mut pick = |idx: usize| {
                CATEGORICAL_FIELDS[idx]
                    .options
                    .choose(rng)
                    .copied()
                    .unwrap_or_default()
                    .to_string()
            };
            let (rbc, pc, pcc, ba, htn) = (pick(0), pick(1), pick(2), pick(3), pick(4));
            let record = FeatureRecord {
                age: f64::from(rng.gen_range(20u32..80)),
                bp: f64::from(rng.gen_range(60u32..180)),
                sg: rng.gen_range(1.005..1.025),
                al: rng.gen_range(0u8..6),
                su: rng.gen_range(0u8..6),
                rbc,
                pc,
                pcc,
                ba,
                htn,
            };
            LabelledRecord {
                record,
                target: rng.gen_range(0u8..2),
            }
        })
        .collect()
}

/// Dense row-major feature matrix with binary labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Vec<f64>,
    n_features: usize,
    labels: Vec<u8>,
}

impl Dataset {
    /// Build from a flat row-major buffer. `labels` must hold one entry per
    /// row and every label must be 0 or 1.
    pub fn new(features: Vec<f64>, n_features: usize, labels: Vec<u8>) -> Result<Self, ModelError> {
        if n_features == 0 {
            return Err(ModelError::InvalidConfig("dataset needs at least one feature".into()));
        }
        if features.len() != labels.len() * n_features {
            return Err(ModelError::FeatureCount {
                expected: labels.len() * n_features,
                got: features.len(),
            });
        }
        if let Some(bad) = labels.iter().find(|&&l| l > 1) {
            return Err(ModelError::InvalidConfig(format!(
                "labels must be 0 or 1, found {bad}"
            )));
        }
        Ok(Self {
            features,
            n_features,
            labels,
        })
    }

    /// Encode a labelled table with an already fitted mapping.
    pub fn encode(rows: &[LabelledRecord], encoders: &EncoderMapping) -> Result<Self, ModelError> {
        let mut features = Vec::with_capacity(rows.len() * ckdrisk_core::N_FEATURES);
        let mut labels = Vec::with_capacity(rows.len());
        for row in rows {
            features.extend_from_slice(&encoders.encode(&row.record)?);
            labels.push(row.target);
        }
        Self::new(features, ckdrisk_core::N_FEATURES, labels)
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.features[i * self.n_features..(i + 1) * self.n_features]
    }

    #[inline]
    pub fn value(&self, i: usize, feature: usize) -> f64 {
        self.features[i * self.n_features + feature]
    }

    #[inline]
    pub fn label(&self, i: usize) -> u8 {
        self.labels[i]
    }
}

/// Shuffle row indices and split off `test_fraction` of them.
///
/// Returns `(train, test)`. A non-zero fraction always leaves at least one
/// row on each side when there are two or more rows.
pub fn holdout_split(n_rows: usize, test_fraction: f64, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n_rows).collect();
    if test_fraction <= 0.0 || n_rows < 2 {
        return (idx, Vec::new());
    }
    idx.shuffle(rng);
    let n_test = ((n_rows as f64 * test_fraction).round() as usize).clamp(1, n_rows - 1);
    let test = idx.split_off(n_rows - n_test);
    (idx, test)
}
