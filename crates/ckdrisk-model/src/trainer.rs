//! Offline training: table → encoders → forest → artifacts.

use std::path::Path;

use ckdrisk_core::FEATURE_COLUMNS;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::dataset::{Dataset, LabelledRecord, holdout_split, synthetic_table};
use crate::{EncoderMapping, ForestParams, ModelError, RandomForest, RiskModel};

/// Offset applied to the seed for the holdout shuffle, so it does not replay
/// the stream used to draw the synthetic table.
const SPLIT_SEED_OFFSET: u64 = 0x9e37_79b9;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Rows of synthetic data to generate.
    pub n_rows: usize,
    /// Share of rows held out for evaluation, in `[0, 1)`.
    pub test_fraction: f64,
    pub forest: ForestParams,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            n_rows: 1000,
            test_fraction: 0.2,
            forest: ForestParams::default(),
        }
    }
}

impl TrainConfig {
    fn validate(&self) -> Result<(), ModelError> {
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(ModelError::InvalidConfig(format!(
                "test_fraction must be in [0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Rows the persisted forest was fit on: always the whole table.
    pub n_fit: usize,
    /// Size of the evaluation split used for `test_accuracy`.
    pub n_train: usize,
    pub n_test: usize,
    /// Accuracy of the persisted forest on the rows it was fit on.
    pub train_accuracy: f64,
    /// Accuracy on the held-out rows of a forest fit on the evaluation
    /// split only. `None` when no rows were held out.
    pub test_accuracy: Option<f64>,
    /// `(column, importance)` of the persisted forest, most important first.
    pub feature_importances: Vec<(&'static str, f64)>,
}

#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: RiskModel,
    pub report: TrainReport,
}

/// Generate a synthetic table from the configured seed and train on it.
pub fn train(config: &TrainConfig) -> Result<TrainedModel, ModelError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.forest.seed);
    let rows = synthetic_table(config.n_rows, &mut rng);
    info!(rows = rows.len(), seed = config.forest.seed, "generated synthetic table");
    train_on(&rows, config)
}

/// Train on a caller-supplied labelled table.
///
/// Encoders and the persisted forest are fitted on the whole table. When
/// `test_fraction` is non-zero a second forest is fitted on the evaluation
/// split to measure holdout accuracy; it is then discarded.
pub fn train_on(rows: &[LabelledRecord], config: &TrainConfig) -> Result<TrainedModel, ModelError> {
    config.validate()?;
    if rows.is_empty() {
        return Err(ModelError::EmptyDataset);
    }

    let encoders = EncoderMapping::fit(rows.iter().map(|r| &r.record))?;
    for (column, enc) in encoders.columns() {
        info!(column, classes = ?enc.classes(), "fitted label encoder");
    }

    let mut split_rng = StdRng::seed_from_u64(config.forest.seed.wrapping_add(SPLIT_SEED_OFFSET));
    let (train_idx, test_idx) = holdout_split(rows.len(), config.test_fraction, &mut split_rng);
    let test_accuracy = if test_idx.is_empty() {
        None
    } else {
        let pick = |idx: &[usize]| -> Vec<LabelledRecord> {
            idx.iter().map(|&i| rows[i].clone()).collect()
        };
        let eval_set = Dataset::encode(&pick(&train_idx), &encoders)?;
        let test_set = Dataset::encode(&pick(&test_idx), &encoders)?;
        let eval_forest = RandomForest::fit(&eval_set, &config.forest)?;
        Some(eval_forest.accuracy(&test_set)?)
    };

    let full = Dataset::encode(rows, &encoders)?;
    let classifier = RandomForest::fit(&full, &config.forest)?;
    let train_accuracy = classifier.accuracy(&full)?;

    let mut feature_importances: Vec<(&'static str, f64)> = FEATURE_COLUMNS
        .iter()
        .copied()
        .zip(classifier.feature_importances().iter().copied())
        .collect();
    feature_importances.sort_by(|a, b| b.1.total_cmp(&a.1));

    let report = TrainReport {
        n_fit: full.n_rows(),
        n_train: train_idx.len(),
        n_test: test_idx.len(),
        train_accuracy,
        test_accuracy,
        feature_importances,
    };
    info!(
        n_fit = report.n_fit,
        n_test = report.n_test,
        train_accuracy = report.train_accuracy,
        test_accuracy = ?report.test_accuracy,
        "training complete"
    );

    Ok(TrainedModel {
        model: RiskModel::from_parts(classifier, encoders)?,
        report,
    })
}

/// Train from `config` and write both artifacts into `model_dir`.
pub fn train_and_save(config: &TrainConfig, model_dir: &Path) -> Result<TrainReport, ModelError> {
    let trained = train(config)?;
    trained.model.save(model_dir)?;
    info!(dir = %model_dir.display(), "model and encoders saved");
    Ok(trained.report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact;

    fn quick() -> TrainConfig {
        TrainConfig {
            n_rows: 150,
            test_fraction: 0.2,
            forest: ForestParams {
                n_trees: 8,
                ..ForestParams::default()
            },
        }
    }

    #[test]
    fn defaults_follow_reference_trainer() {
        let c = TrainConfig::default();
        assert_eq!(c.n_rows, 1000);
        assert_eq!(c.forest.n_trees, 100);
        assert_eq!(c.forest.seed, 42);
    }

    #[test]
    fn report_accounts_for_every_row() {
        let trained = train(&quick()).unwrap();
        let r = &trained.report;
        assert_eq!(r.n_fit, 150);
        assert_eq!(r.n_train + r.n_test, 150);
        assert_eq!(r.n_test, 30);
        assert!((0.0..=1.0).contains(&r.train_accuracy));
        assert!(r.test_accuracy.is_some_and(|a| (0.0..=1.0).contains(&a)));
    }

    #[test]
    fn fully_grown_trees_fit_training_rows_well() {
        let trained = train(&quick()).unwrap();
        // Random labels carry no signal, but unpruned bagged trees still
        // memorise most of what they were trained on.
        assert!(trained.report.train_accuracy > 0.8);
    }

    #[test]
    fn importances_cover_every_column_sorted() {
        let trained = train(&quick()).unwrap();
        let imp = &trained.report.feature_importances;
        assert_eq!(imp.len(), FEATURE_COLUMNS.len());
        assert!(imp.windows(2).all(|w| w[0].1 >= w[1].1));
        assert!((imp.iter().map(|(_, v)| v).sum::<f64>() - 1.0).abs() < 1e-9);
        for col in FEATURE_COLUMNS {
            assert!(imp.iter().any(|(c, _)| *c == col));
        }
    }

    #[test]
    fn encoders_use_sorted_codes() {
        let trained = train(&quick()).unwrap();
        let enc = trained.model.encoders();
        assert_eq!(enc.rbc.classes(), ["abnormal", "normal"]);
        assert_eq!(enc.pc.classes(), ["abnormal", "normal"]);
        assert_eq!(enc.pcc.classes(), ["notpresent", "present"]);
        assert_eq!(enc.ba.classes(), ["notpresent", "present"]);
        assert_eq!(enc.htn.classes(), ["no", "yes"]);
    }

    #[test]
    fn same_seed_same_classifier_bytes() {
        let a = train(&quick()).unwrap();
        let b = train(&quick()).unwrap();
        assert_eq!(
            serde_json::to_vec(a.model.classifier()).unwrap(),
            serde_json::to_vec(b.model.classifier()).unwrap()
        );
        assert_eq!(a.report, b.report);
    }

    #[test]
    fn persisted_forest_is_fit_on_the_whole_table() {
        let config = quick();
        let trained = train(&config).unwrap();

        let mut rng = StdRng::seed_from_u64(config.forest.seed);
        let rows = synthetic_table(config.n_rows, &mut rng);
        let full = Dataset::encode(&rows, trained.model.encoders()).unwrap();
        let expected = RandomForest::fit(&full, &config.forest).unwrap();
        assert_eq!(trained.model.classifier(), &expected);
        assert_eq!(trained.report.n_fit, config.n_rows);
    }

    #[test]
    fn holdout_does_not_change_persisted_forest() {
        let with_holdout = train(&quick()).unwrap();
        let without = train(&TrainConfig {
            test_fraction: 0.0,
            ..quick()
        })
        .unwrap();
        assert_eq!(with_holdout.model.classifier(), without.model.classifier());
        assert!(with_holdout.report.test_accuracy.is_some());
        assert_eq!(without.report.test_accuracy, None);
    }

    #[test]
    fn zero_test_fraction_skips_holdout() {
        let config = TrainConfig {
            test_fraction: 0.0,
            ..quick()
        };
        let r = train(&config).unwrap().report;
        assert_eq!(r.n_test, 0);
        assert_eq!(r.test_accuracy, None);
    }

    #[test]
    fn invalid_fraction_is_rejected() {
        for f in [-0.1, 1.0, 2.0, f64::NAN] {
            let config = TrainConfig {
                test_fraction: f,
                ..quick()
            };
            assert!(matches!(train(&config), Err(ModelError::InvalidConfig(_))));
        }
    }

    #[test]
    fn empty_table_is_rejected() {
        let config = TrainConfig {
            n_rows: 0,
            ..quick()
        };
        assert!(matches!(train(&config), Err(ModelError::EmptyDataset)));
    }

    #[test]
    fn train_and_save_writes_loadable_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let report = train_and_save(&quick(), dir.path()).unwrap();
        assert_eq!(report.n_fit, 150);
        assert_eq!(report.n_train, 120);
        assert!(artifact::model_path(dir.path()).exists());
        assert!(artifact::encoders_path(dir.path()).exists());
        let model = RiskModel::load(dir.path()).unwrap();
        assert_eq!(model.classifier().n_trees(), 8);
    }
}
