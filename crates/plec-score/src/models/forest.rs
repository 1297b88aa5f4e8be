//! Random-forest regressor for the rf variant.
//!
//! 100 variance-reduction CART trees over bootstrap samples with out-of-bag
//! scoring. Tree construction is fanned out with rayon under the configured
//! parallelism hint; every tree draws from its own seeded RNG stream, so
//! the fitted forest is identical under any thread scheduling.
//!
//! The tree implementation only consumes dense rows, so descriptors are
//! densified before fitting and before OOB prediction.

use crate::parallel::run_in_pool;
use crate::{Result, ScoreError};
use plec_core::SparseVector;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Fixed hyperparameters for the rf variant.
const N_ESTIMATORS: usize = 100;
const MIN_SAMPLES_SPLIT: usize = 2;
const SEED: u64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestRegressor {
    n_estimators: usize,
    min_samples_split: usize,
    n_jobs: i32,
    oob_score: bool,
    seed: u64,
    n_features: u32,
    trees: Vec<DecisionTree>,
    oob_prediction: Vec<f64>,
    fitted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: u32,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

impl ForestRegressor {
    /// New untrained forest over `n_features` inputs
    pub fn new(n_features: u32, n_jobs: i32) -> Self {
        Self {
            n_estimators: N_ESTIMATORS,
            min_samples_split: MIN_SAMPLES_SPLIT,
            n_jobs,
            oob_score: true,
            seed: SEED,
            n_features,
            trees: Vec::new(),
            oob_prediction: Vec::new(),
            fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Out-of-bag predictions over the training set, available after fit
    pub fn oob_prediction(&self) -> Option<&[f64]> {
        if self.fitted && self.oob_score {
            Some(&self.oob_prediction)
        } else {
            None
        }
    }

    /// Fit on densified descriptor rows.
    pub fn fit(&mut self, descs: &[SparseVector], target: &[f64]) -> Result<()> {
        let rows: Vec<Vec<f64>> = descs.iter().map(|d| d.to_dense()).collect();
        let n_samples = rows.len();

        let builds: Vec<(DecisionTree, Vec<bool>)> = {
            let rows = &rows;
            let seed = self.seed;
            let min_split = self.min_samples_split;
            let n_estimators = self.n_estimators;
            run_in_pool(self.n_jobs, move || {
                use rayon::prelude::*;
                (0..n_estimators)
                    .into_par_iter()
                    .map(|tree_idx| {
                        let mut rng =
                            rand::rngs::StdRng::seed_from_u64(tree_seed(seed, tree_idx));
                        let mut in_bag = vec![false; n_samples];
                        let sample: Vec<usize> = (0..n_samples)
                            .map(|_| {
                                let i = rng.gen_range(0..n_samples);
                                in_bag[i] = true;
                                i
                            })
                            .collect();

                        let tree = DecisionTree::grow(rows, target, sample, min_split);
                        (tree, in_bag)
                    })
                    .collect()
            })?
        };

        self.trees = builds.iter().map(|(tree, _)| tree.clone()).collect();

        // out-of-bag: average predictions of trees that never saw the sample
        let mut oob_sum = vec![0.0; n_samples];
        let mut oob_count = vec![0u32; n_samples];
        for (tree, in_bag) in &builds {
            for (i, row) in rows.iter().enumerate() {
                if !in_bag[i] {
                    oob_sum[i] += tree.predict(row);
                    oob_count[i] += 1;
                }
            }
        }
        self.oob_prediction = (0..n_samples)
            .map(|i| {
                if oob_count[i] > 0 {
                    oob_sum[i] / oob_count[i] as f64
                } else {
                    // sample drawn into every bootstrap; fall back to the
                    // full-forest estimate
                    self.predict_row(&rows[i])
                }
            })
            .collect();

        self.fitted = true;
        Ok(())
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        sum / self.trees.len() as f64
    }

    /// Predict a single descriptor (densified first)
    pub fn predict_one(&self, desc: &SparseVector) -> Result<f64> {
        if !self.fitted {
            return Err(ScoreError::NotTrained);
        }
        Ok(self.predict_row(&desc.to_dense()))
    }

    pub fn predict(&self, descs: &[SparseVector]) -> Result<Vec<f64>> {
        descs.iter().map(|d| self.predict_one(d)).collect()
    }
}

/// Per-tree RNG stream: splitmix64 over the forest seed and tree index.
fn tree_seed(seed: u64, tree_idx: usize) -> u64 {
    let mut z = seed
        .wrapping_add(0x9e3779b97f4a7c15u64.wrapping_mul(tree_idx as u64 + 1));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

impl DecisionTree {
    /// Grow a tree to purity over the bootstrap sample.
    fn grow(
        rows: &[Vec<f64>],
        target: &[f64],
        sample: Vec<usize>,
        min_samples_split: usize,
    ) -> Self {
        let mut nodes = Vec::new();
        Self::grow_node(rows, target, sample, min_samples_split, &mut nodes);
        Self { nodes }
    }

    /// Recursively grow a node; returns its index in `nodes`.
    fn grow_node(
        rows: &[Vec<f64>],
        target: &[f64],
        sample: Vec<usize>,
        min_samples_split: usize,
        nodes: &mut Vec<TreeNode>,
    ) -> usize {
        let mean = sample.iter().map(|&i| target[i]).sum::<f64>() / sample.len() as f64;

        if sample.len() < min_samples_split || Self::is_pure(target, &sample) {
            nodes.push(TreeNode::Leaf { value: mean });
            return nodes.len() - 1;
        }

        let Some((feature, threshold)) = Self::best_split(rows, target, &sample) else {
            nodes.push(TreeNode::Leaf { value: mean });
            return nodes.len() - 1;
        };

        let (left_sample, right_sample): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| rows[i][feature as usize] <= threshold);

        let index = nodes.len();
        nodes.push(TreeNode::Leaf { value: mean }); // placeholder until children exist
        let left = Self::grow_node(rows, target, left_sample, min_samples_split, nodes);
        let right = Self::grow_node(rows, target, right_sample, min_samples_split, nodes);
        nodes[index] = TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        index
    }

    fn is_pure(target: &[f64], sample: &[usize]) -> bool {
        let first = target[sample[0]];
        sample.iter().all(|&i| target[i] == first)
    }

    /// Exhaustive variance-reduction split search over all features.
    fn best_split(rows: &[Vec<f64>], target: &[f64], sample: &[usize]) -> Option<(u32, f64)> {
        let n_features = rows[0].len();
        let n = sample.len() as f64;
        let total_sum: f64 = sample.iter().map(|&i| target[i]).sum();

        let mut best: Option<(u32, f64, f64)> = None; // (feature, threshold, score)

        for feature in 0..n_features {
            let mut values: Vec<(f64, f64)> = sample
                .iter()
                .map(|&i| (rows[i][feature], target[i]))
                .collect();
            values.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("finite feature values"));

            let mut left_sum = 0.0;
            let mut left_n = 0.0;
            for k in 0..values.len() - 1 {
                left_sum += values[k].1;
                left_n += 1.0;
                if values[k].0 == values[k + 1].0 {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_n = n - left_n;
                // maximizing left_sum^2/left_n + right_sum^2/right_n minimizes
                // the weighted child variance
                let score = left_sum * left_sum / left_n + right_sum * right_sum / right_n;

                if best.map_or(true, |(_, _, s)| score > s) {
                    let threshold = (values[k].0 + values[k + 1].0) / 2.0;
                    best = Some((feature as u32, threshold, score));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }

    fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature as usize] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}
