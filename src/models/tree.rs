//! Regression-tree learner shared by both tree-ensemble kinds.
//!
//! Trees are grown greedily on variance reduction. The forest fits them
//! directly on 0/1 targets (leaf value = class-1 fraction); gradient boosting
//! fits them on pseudo-residuals. Nodes live in a flat `Vec` so the fitted
//! tree serializes as plain data.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Number of random candidate features per split; `None` = all features.
    pub feature_subsample: Option<usize>,
}

impl Tree {
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x.get(*feature).copied().unwrap_or(0.0) < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Grow a tree on the samples selected by `idx`. Split gains (weighted
    /// variance reduction) are accumulated into `importance` per feature.
    pub fn grow(
        x: &[Vec<f64>],
        y: &[f64],
        idx: &[usize],
        params: TreeParams,
        rng: &mut StdRng,
        importance: &mut [f64],
    ) -> Tree {
        let mut tree = Tree { nodes: Vec::new() };
        tree.grow_node(x, y, idx, 0, params, rng, importance);
        tree
    }

    fn grow_node(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        idx: &[usize],
        depth: usize,
        params: TreeParams,
        rng: &mut StdRng,
        importance: &mut [f64],
    ) -> usize {
        let mean = mean_of(y, idx);
        let node_id = self.nodes.len();

        if depth >= params.max_depth || idx.len() < 2 * params.min_samples_leaf {
            self.nodes.push(Node::Leaf { value: mean });
            return node_id;
        }

        let n_features = x[idx[0]].len();
        let candidates = candidate_features(n_features, params.feature_subsample, rng);

        let Some(split) = best_split(x, y, idx, &candidates, params.min_samples_leaf) else {
            self.nodes.push(Node::Leaf { value: mean });
            return node_id;
        };

        importance[split.feature] += split.gain * idx.len() as f64;

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
            .iter()
            .copied()
            .partition(|&i| x[i][split.feature] < split.threshold);

        // Placeholder; children are appended after, then patched in.
        self.nodes.push(Node::Leaf { value: mean });
        let left = self.grow_node(x, y, &left_idx, depth + 1, params, rng, importance);
        let right = self.grow_node(x, y, &right_idx, depth + 1, params, rng, importance);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn candidate_features(
    n_features: usize,
    subsample: Option<usize>,
    rng: &mut StdRng,
) -> Vec<usize> {
    let all: Vec<usize> = (0..n_features).collect();
    match subsample {
        Some(k) if k < n_features => {
            let mut picked = all;
            picked.shuffle(rng);
            picked.truncate(k);
            picked
        }
        _ => all,
    }
}

/// Exhaustive threshold scan over the candidate features: sort the node's
/// samples per feature, sweep prefix sums, keep the best variance reduction.
fn best_split(
    x: &[Vec<f64>],
    y: &[f64],
    idx: &[usize],
    candidates: &[usize],
    min_leaf: usize,
) -> Option<SplitChoice> {
    let n = idx.len() as f64;
    let total_sum: f64 = idx.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = idx.iter().map(|&i| y[i] * y[i]).sum();
    let parent_var = total_sq - total_sum * total_sum / n;

    let mut best: Option<SplitChoice> = None;

    for &feature in candidates {
        let mut pairs: Vec<(f64, f64)> = idx.iter().map(|&i| (x[i][feature], y[i])).collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for (k, (value, target)) in pairs.iter().enumerate().take(pairs.len() - 1) {
            left_sum += target;
            left_sq += target * target;
            let left_n = (k + 1) as f64;
            let right_n = n - left_n;

            // No split between identical feature values
            if *value >= pairs[k + 1].0 {
                continue;
            }
            if (k + 1) < min_leaf || (pairs.len() - k - 1) < min_leaf {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let left_var = left_sq - left_sum * left_sum / left_n;
            let right_var = right_sq - right_sum * right_sum / right_n;
            let gain = parent_var - left_var - right_var;

            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(SplitChoice {
                    feature,
                    threshold: (value + pairs[k + 1].0) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}

fn mean_of(y: &[f64], idx: &[usize]) -> f64 {
    if idx.is_empty() {
        return 0.0;
    }
    idx.iter().map(|&i| y[i]).sum::<f64>() / idx.len() as f64
}
