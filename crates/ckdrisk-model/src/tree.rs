//! CART decision tree with Gini impurity for binary targets.
//!
//! Nodes live in a flat vector with the root at index 0. A split sends a row
//! left when `row[feature] <= threshold`.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: u32,
        threshold: f64,
        left: u32,
        right: u32,
    },
    Leaf {
        /// Class distribution of the training rows that reached this leaf.
        proba: [f64; 2],
    },
}

/// Growth limits shared by every tree of a forest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grow a tree on the rows named by `indices` (duplicates allowed).
    ///
    /// Returns the tree together with its unnormalized impurity decrease per
    /// feature.
    pub(crate) fn grow(
        data: &Dataset,
        indices: &mut [usize],
        params: &GrowParams,
        rng: &mut StdRng,
    ) -> (Self, Vec<f64>) {
        let mut builder = Builder {
            data,
            params,
            rng,
            nodes: Vec::new(),
            importances: vec![0.0; data.n_features()],
        };
        builder.build(indices, 0);
        (
            Self {
                nodes: builder.nodes,
            },
            builder.importances,
        )
    }

    /// Class probabilities stored at the leaf `row` lands in.
    pub fn predict_proba(&self, row: &[f64]) -> [f64; 2] {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { proba } => return *proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature as usize] <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + walk(nodes, *left as usize).max(walk(nodes, *right as usize))
                }
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    /// Structural check for trees read back from disk: non-empty, every
    /// child index points forward and in bounds, every split feature is
    /// below `n_features`, and leaf distributions are finite.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        let n = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature as usize >= n_features {
                        return Err(format!("node {i}: feature {feature} out of range"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i}: non-finite threshold"));
                    }
                    for child in [*left as usize, *right as usize] {
                        if child <= i || child >= n {
                            return Err(format!("node {i}: bad child index {child}"));
                        }
                    }
                }
                Node::Leaf { proba } => {
                    if proba.iter().any(|p| !p.is_finite() || *p < 0.0) {
                        return Err(format!("node {i}: invalid leaf distribution"));
                    }
                }
            }
        }
        Ok(())
    }
}

struct Builder<'a> {
    data: &'a Dataset,
    params: &'a GrowParams,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Weighted child impurity, `(n_l * gini_l + n_r * gini_r) / n`.
    impurity: f64,
}

impl Builder<'_> {
    fn build(&mut self, indices: &mut [usize], depth: usize) -> u32 {
        let counts = self.class_counts(indices);
        let id = self.nodes.len();
        self.nodes.push(leaf(counts));

        let n = indices.len();
        let pure = counts[0] == 0 || counts[1] == 0;
        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if pure || depth_reached || n < self.params.min_samples_split {
            return id as u32;
        }

        let parent_impurity = gini(counts);
        let Some(split) = self.best_split(indices, counts) else {
            return id as u32;
        };

        let feature = split.feature;
        let threshold = split.threshold;
        let n_left = partition(indices, |i| self.data.value(i, feature) <= threshold);
        self.importances[feature] += n as f64 * (parent_impurity - split.impurity);

        let (left_rows, right_rows) = indices.split_at_mut(n_left);
        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);

        self.nodes[id] = Node::Split {
            feature: feature as u32,
            threshold,
            left,
            right,
        };
        id as u32
    }

    fn class_counts(&self, indices: &[usize]) -> [usize; 2] {
        let mut counts = [0usize; 2];
        for &i in indices {
            counts[self.data.label(i) as usize] += 1;
        }
        counts
    }

    /// Search a random subset of features for the lowest weighted impurity.
    ///
    /// Features are visited in shuffled order. The search stops after
    /// `max_features` features once a valid split has been found; if none of
    /// those yields one, it keeps going through the remaining features.
    fn best_split(&mut self, indices: &[usize], counts: [usize; 2]) -> Option<SplitCandidate> {
        let mut order: Vec<usize> = (0..self.data.n_features()).collect();
        order.shuffle(&mut *self.rng);

        let mut best: Option<SplitCandidate> = None;
        let mut pairs: Vec<(f64, u8)> = Vec::with_capacity(indices.len());
        for (visited, &feature) in order.iter().enumerate() {
            if visited >= self.params.max_features && best.is_some() {
                break;
            }

            pairs.clear();
            pairs.extend(
                indices
                    .iter()
                    .map(|&i| (self.data.value(i, feature), self.data.label(i))),
            );
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            if let Some(candidate) = self.scan_feature(feature, &pairs, counts)
                && best
                    .as_ref()
                    .is_none_or(|b| candidate.impurity < b.impurity)
            {
                best = Some(candidate);
            }
        }
        best
    }

    /// Sweep sorted `(value, label)` pairs; thresholds sit halfway between
    /// consecutive distinct values.
    fn scan_feature(
        &self,
        feature: usize,
        pairs: &[(f64, u8)],
        counts: [usize; 2],
    ) -> Option<SplitCandidate> {
        let n = pairs.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut left = [0usize; 2];
        let mut best: Option<SplitCandidate> = None;

        for pos in 0..n - 1 {
            left[pairs[pos].1 as usize] += 1;
            let (lo, hi) = (pairs[pos].0, pairs[pos + 1].0);
            if lo >= hi {
                continue;
            }
            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let right = [counts[0] - left[0], counts[1] - left[1]];
            let impurity =
                (n_left as f64 * gini(left) + n_right as f64 * gini(right)) / n as f64;
            if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                let mut threshold = lo + (hi - lo) / 2.0;
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
        best
    }
}

fn leaf(counts: [usize; 2]) -> Node {
    let total = (counts[0] + counts[1]).max(1) as f64;
    Node::Leaf {
        proba: [counts[0] as f64 / total, counts[1] as f64 / total],
    }
}

fn gini(counts: [usize; 2]) -> f64 {
    let total = (counts[0] + counts[1]) as f64;
    if total == 0.0 {
        return 0.0;
    }
    let p0 = counts[0] as f64 / total;
    let p1 = counts[1] as f64 / total;
    1.0 - p0 * p0 - p1 * p1
}

/// Reorder `items` so every element matching `pred` comes first; returns
/// how many matched.
fn partition(items: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut next = 0;
    for i in 0..items.len() {
        if pred(items[i]) {
            items.swap(next, i);
            next += 1;
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params(max_features: usize) -> GrowParams {
        GrowParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features,
        }
    }

    fn grow_all(data: &Dataset, p: &GrowParams, seed: u64) -> (DecisionTree, Vec<f64>) {
        let mut idx: Vec<usize> = (0..data.n_rows()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        DecisionTree::grow(data, &mut idx, p, &mut rng)
    }

    #[test]
    fn gini_values() {
        assert_eq!(gini([5, 0]), 0.0);
        assert_eq!(gini([0, 0]), 0.0);
        assert!((gini([5, 5]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn partition_moves_matches_first() {
        let mut items = vec![5, 2, 8, 1, 9];
        let n = partition(&mut items, |v| v < 5);
        assert_eq!(n, 2);
        let (lo, hi) = items.split_at(n);
        assert!(lo.iter().all(|&v| v < 5));
        assert!(hi.iter().all(|&v| v >= 5));
    }

    #[test]
    fn pure_node_becomes_single_leaf() {
        let data = Dataset::new(vec![1.0, 2.0, 3.0], 1, vec![1, 1, 1]).unwrap();
        let (tree, imp) = grow_all(&data, &params(1), 0);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict_proba(&[10.0]), [0.0, 1.0]);
        assert_eq!(imp, vec![0.0]);
    }

    #[test]
    fn splits_on_threshold_midpoint() {
        let data = Dataset::new(vec![1.0, 2.0, 3.0, 4.0], 1, vec![0, 0, 1, 1]).unwrap();
        let (tree, imp) = grow_all(&data, &params(1), 0);
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.depth(), 1);
        match &tree.nodes[0] {
            Node::Split { threshold, .. } => assert_eq!(*threshold, 2.5),
            other => panic!("expected split, got {other:?}"),
        }
        assert_eq!(tree.predict_proba(&[2.5]), [1.0, 0.0]);
        assert_eq!(tree.predict_proba(&[2.6]), [0.0, 1.0]);
        // Parent gini 0.5 over 4 rows, children pure.
        assert!((imp[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn picks_informative_feature() {
        // Feature 0 is noise, feature 1 separates the classes.
        let features = vec![
            3.0, 0.0, //
            1.0, 0.1, //
            2.0, 0.2, //
            1.0, 0.9, //
            3.0, 1.0, //
            2.0, 1.1, //
        ];
        let data = Dataset::new(features, 2, vec![0, 0, 0, 1, 1, 1]).unwrap();
        let (tree, imp) = grow_all(&data, &params(2), 0);
        assert_eq!(tree.n_leaves(), 2);
        assert!(imp[1] > 0.0);
        assert_eq!(imp[0], 0.0);
    }

    #[test]
    fn constant_features_yield_leaf() {
        let data = Dataset::new(vec![1.0, 1.0, 1.0, 1.0], 1, vec![0, 1, 0, 1]).unwrap();
        let (tree, _) = grow_all(&data, &params(1), 0);
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict_proba(&[1.0]), [0.5, 0.5]);
    }

    #[test]
    fn search_continues_past_constant_features() {
        // Feature 0 is constant; with max_features = 1 the builder must still
        // find the split on feature 1 whichever feature it draws first.
        let features = vec![7.0, 1.0, 7.0, 2.0, 7.0, 3.0, 7.0, 4.0];
        let data = Dataset::new(features, 2, vec![0, 0, 1, 1]).unwrap();
        for seed in 0..8 {
            let (tree, _) = grow_all(&data, &params(1), seed);
            assert_eq!(tree.n_nodes(), 3, "seed {seed}");
        }
    }

    #[test]
    fn max_depth_limits_growth() {
        let data = Dataset::new(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            1,
            vec![0, 1, 0, 1, 0, 1],
        )
        .unwrap();
        let mut p = params(1);
        p.max_depth = Some(1);
        let (tree, _) = grow_all(&data, &p, 0);
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn min_samples_leaf_is_respected() {
        let data = Dataset::new(vec![1.0, 2.0, 3.0, 4.0], 1, vec![0, 1, 1, 1]).unwrap();
        let mut p = params(1);
        p.min_samples_leaf = 2;
        let (tree, _) = grow_all(&data, &p, 0);
        // The only pure cut (after the first row) would leave one row.
        match &tree.nodes[0] {
            Node::Split { threshold, .. } => assert_eq!(*threshold, 2.5),
            other => panic!("expected split, got {other:?}"),
        }
    }

    #[test]
    fn validate_catches_bad_trees() {
        let data = Dataset::new(vec![1.0, 2.0, 3.0, 4.0], 1, vec![0, 0, 1, 1]).unwrap();
        let (tree, _) = grow_all(&data, &params(1), 0);
        assert!(tree.validate(1).is_ok());
        assert!(tree.validate(0).is_err());

        let empty = DecisionTree { nodes: vec![] };
        assert!(empty.validate(1).is_err());

        let cyclic = DecisionTree {
            nodes: vec![Node::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 0,
            }],
        };
        assert!(cyclic.validate(1).is_err());
    }
}
