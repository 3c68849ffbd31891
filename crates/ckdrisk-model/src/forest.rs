//! Bootstrap-aggregated forest of CART trees for binary classification.
//!
//! Class probabilities are the mean of the per-tree leaf distributions; the
//! predicted class is the argmax, with ties going to class 0.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ModelError;
use crate::dataset::Dataset;
use crate::tree::{DecisionTree, GrowParams};

/// Training parameters for [`RandomForest::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split. `None` means `floor(sqrt(n_features))`.
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestParams {
    fn validate(&self) -> Result<(), ModelError> {
        if self.n_trees == 0 {
            return Err(ModelError::InvalidConfig("n_trees must be at least 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(ModelError::InvalidConfig(
                "min_samples_split must be at least 2".into(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(ModelError::InvalidConfig(
                "min_samples_leaf must be at least 1".into(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(ModelError::InvalidConfig(
                "max_features must be at least 1".into(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(ModelError::InvalidConfig("max_depth must be at least 1".into()));
        }
        Ok(())
    }

    fn grow_params(&self, n_features: usize) -> GrowParams {
        let sqrt = ((n_features as f64).sqrt().floor() as usize).max(1);
        GrowParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features.unwrap_or(sqrt).min(n_features),
        }
    }
}

/// Trained random-forest classifier. Immutable once fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<DecisionTree>,
    /// Mean decrease in impurity per feature, normalized to sum to 1.
    feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn fit(data: &Dataset, params: &ForestParams) -> Result<Self, ModelError> {
        params.validate()?;
        if data.is_empty() {
            return Err(ModelError::EmptyDataset);
        }

        let n_rows = data.n_rows();
        let n_features = data.n_features();
        let grow = params.grow_params(n_features);
        let mut rng = StdRng::seed_from_u64(params.seed);

        let mut trees = Vec::with_capacity(params.n_trees);
        let mut importances = vec![0.0f64; n_features];
        let mut indices = vec![0usize; n_rows];

        for t in 0..params.n_trees {
            let mut tree_rng = StdRng::seed_from_u64(rng.next_u64());
            if params.bootstrap {
                for slot in indices.iter_mut() {
                    *slot = tree_rng.gen_range(0..n_rows);
                }
            } else {
                for (i, slot) in indices.iter_mut().enumerate() {
                    *slot = i;
                }
            }

            let (tree, tree_importances) =
                DecisionTree::grow(data, &mut indices, &grow, &mut tree_rng);
            let total: f64 = tree_importances.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&tree_importances) {
                    *acc += v / total;
                }
            }
            debug!(
                tree = t,
                nodes = tree.n_nodes(),
                leaves = tree.n_leaves(),
                depth = tree.depth(),
                "grew tree"
            );
            trees.push(tree);
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for v in &mut importances {
                *v /= total;
            }
        }

        info!(
            trees = trees.len(),
            rows = n_rows,
            features = n_features,
            max_features = grow.max_features,
            "fitted random forest"
        );
        Ok(Self {
            n_features,
            trees,
            feature_importances: importances,
        })
    }

    /// Mean class distribution over all trees.
    pub fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], ModelError> {
        if row.len() != self.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.n_features,
                got: row.len(),
            });
        }
        let mut sum = [0.0f64; 2];
        for tree in &self.trees {
            let p = tree.predict_proba(row);
            sum[0] += p[0];
            sum[1] += p[1];
        }
        let n = self.trees.len() as f64;
        Ok([sum[0] / n, sum[1] / n])
    }

    /// Predicted class (0 or 1).
    pub fn predict(&self, row: &[f64]) -> Result<u8, ModelError> {
        self.predict_proba(row).map(class_of)
    }

    /// Fraction of rows in `data` whose predicted class matches the label.
    pub fn accuracy(&self, data: &Dataset) -> Result<f64, ModelError> {
        if data.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        let mut correct = 0usize;
        for i in 0..data.n_rows() {
            if self.predict(data.row(i))? == data.label(i) {
                correct += 1;
            }
        }
        Ok(correct as f64 / data.n_rows() as f64)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Structural check for forests read back from disk.
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".into());
        }
        if self.feature_importances.len() != self.n_features {
            return Err(format!(
                "{} importances for {} features",
                self.feature_importances.len(),
                self.n_features
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }
}

/// Argmax over a binary distribution; an exact tie picks class 0.
pub fn class_of(proba: [f64; 2]) -> u8 {
    u8::from(proba[1] > proba[0])
}
