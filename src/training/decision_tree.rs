//! Histogram regression tree grown best-first on binned features

use super::binning::BinMapper;
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node; children are indices into the tree's node arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with (already shrunk) prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node: `x[feature_idx] <= threshold` (or NaN) goes left
    Split {
        feature_idx: usize,
        threshold: f64,
        bin: u8,
        left: usize,
        right: usize,
        n_samples: usize,
        gain: f64,
    },
}

/// Growth limits for one tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_leaf_nodes: Option<usize>,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub l2_regularization: f64,
    /// Multiplier applied to every leaf value (the learning rate)
    pub shrinkage: f64,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    bin: usize,
    gain: f64,
    left_sum: f64,
    left_count: usize,
}

/// Per-feature residual sums and counts for each bin
#[derive(Debug, Clone)]
struct Histogram {
    sums: Vec<Vec<f64>>,
    counts: Vec<Vec<usize>>,
}

impl Histogram {
    fn build(binned: &Array2<u8>, n_bins: &[usize], residuals: &[f64], rows: &[usize]) -> Self {
        let (sums, counts): (Vec<Vec<f64>>, Vec<Vec<usize>>) = (0..n_bins.len())
            .into_par_iter()
            .map(|f| {
                let mut sums = vec![0.0; n_bins[f]];
                let mut counts = vec![0usize; n_bins[f]];
                for &r in rows {
                    let b = binned[[r, f]] as usize;
                    sums[b] += residuals[r];
                    counts[b] += 1;
                }
                (sums, counts)
            })
            .unzip();
        Self { sums, counts }
    }

    /// Histogram of the sibling: `parent - self`
    fn sibling(&self, parent: &Histogram) -> Histogram {
        let sums = parent
            .sums
            .iter()
            .zip(&self.sums)
            .map(|(p, c)| p.iter().zip(c).map(|(a, b)| a - b).collect())
            .collect();
        let counts = parent
            .counts
            .iter()
            .zip(&self.counts)
            .map(|(p, c)| p.iter().zip(c).map(|(a, b)| a - b).collect())
            .collect();
        Histogram { sums, counts }
    }
}

/// Leaf awaiting a decision during growth
struct OpenLeaf {
    node: usize,
    rows: Vec<usize>,
    sum: f64,
    depth: usize,
    histogram: Histogram,
    split: Option<SplitCandidate>,
}

/// Regression tree over binned features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
    /// Total split gain contributed by each feature
    feature_gains: Vec<f64>,
}

impl RegressionTree {
    /// Grow a tree fitting `residuals` over all rows of `binned`
    pub fn grow(
        binned: &Array2<u8>,
        mapper: &BinMapper,
        residuals: &[f64],
        params: &TreeParams,
    ) -> Self {
        let n_features = binned.ncols();
        let n_bins: Vec<usize> = (0..n_features).map(|f| mapper.n_bins(f)).collect();
        let rows: Vec<usize> = (0..binned.nrows()).collect();
        let sum: f64 = residuals.iter().sum();

        let mut nodes = vec![TreeNode::Leaf {
            value: 0.0,
            n_samples: rows.len(),
        }];
        let mut feature_gains = vec![0.0; n_features];

        let histogram = Histogram::build(binned, &n_bins, residuals, &rows);
        let split = best_split(&histogram, sum, rows.len(), 0, params);
        let mut open = vec![OpenLeaf {
            node: 0,
            rows,
            sum,
            depth: 0,
            histogram,
            split,
        }];
        let mut n_leaves = 1;

        loop {
            if params.max_leaf_nodes.map_or(false, |max| n_leaves >= max) {
                break;
            }

            // Best-first: expand the open leaf with the largest gain
            let mut chosen: Option<(usize, f64)> = None;
            for (i, leaf) in open.iter().enumerate() {
                if let Some(candidate) = leaf.split {
                    if chosen.map_or(true, |(_, g)| candidate.gain > g) {
                        chosen = Some((i, candidate.gain));
                    }
                }
            }
            let Some((idx, _)) = chosen else { break };

            let leaf = open.remove(idx);
            let Some(candidate) = leaf.split else { break };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = leaf
                .rows
                .iter()
                .partition(|&&r| (binned[[r, candidate.feature]] as usize) <= candidate.bin);

            let (left_hist, right_hist) = if left_rows.len() <= right_rows.len() {
                let small = Histogram::build(binned, &n_bins, residuals, &left_rows);
                let large = small.sibling(&leaf.histogram);
                (small, large)
            } else {
                let small = Histogram::build(binned, &n_bins, residuals, &right_rows);
                let large = small.sibling(&leaf.histogram);
                (large, small)
            };

            let left_node = nodes.len();
            let right_node = left_node + 1;
            nodes.push(TreeNode::Leaf {
                value: 0.0,
                n_samples: left_rows.len(),
            });
            nodes.push(TreeNode::Leaf {
                value: 0.0,
                n_samples: right_rows.len(),
            });
            nodes[leaf.node] = TreeNode::Split {
                feature_idx: candidate.feature,
                threshold: mapper.threshold(candidate.feature, candidate.bin),
                bin: candidate.bin as u8,
                left: left_node,
                right: right_node,
                n_samples: leaf.rows.len(),
                gain: candidate.gain,
            };
            feature_gains[candidate.feature] += candidate.gain;
            n_leaves += 1;

            let depth = leaf.depth + 1;
            let left_sum = candidate.left_sum;
            let right_sum = leaf.sum - left_sum;
            debug_assert_eq!(left_rows.len(), candidate.left_count);

            let left_split = best_split(&left_hist, left_sum, left_rows.len(), depth, params);
            let right_split = best_split(&right_hist, right_sum, right_rows.len(), depth, params);
            open.push(OpenLeaf {
                node: left_node,
                rows: left_rows,
                sum: left_sum,
                depth,
                histogram: left_hist,
                split: left_split,
            });
            open.push(OpenLeaf {
                node: right_node,
                rows: right_rows,
                sum: right_sum,
                depth,
                histogram: right_hist,
                split: right_split,
            });
        }

        for leaf in open {
            let n = leaf.rows.len();
            nodes[leaf.node] = TreeNode::Leaf {
                value: params.shrinkage * leaf_value(leaf.sum, n, params.l2_regularization),
                n_samples: n,
            };
        }

        Self {
            nodes,
            feature_gains,
        }
    }

    /// Predict one raw feature row
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    let v = row[*feature_idx];
                    idx = if v.is_nan() || v <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Predict one binned row (training-time fast path)
    pub fn predict_binned_row(&self, row: ArrayView1<u8>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    bin,
                    left,
                    right,
                    ..
                } => {
                    idx = if row[*feature_idx] <= *bin { *left } else { *right };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    /// Depth counted in edges (a single leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        walk(&self.nodes, 0)
    }

    pub fn feature_gains(&self) -> &[f64] {
        &self.feature_gains
    }
}

/// L2-regularised mean residual
fn leaf_value(sum: f64, n: usize, l2: f64) -> f64 {
    sum / (n as f64 + l2)
}

fn score(sum: f64, n: usize, l2: f64) -> f64 {
    sum * sum / (n as f64 + l2)
}

fn best_split(
    histogram: &Histogram,
    sum: f64,
    n: usize,
    depth: usize,
    params: &TreeParams,
) -> Option<SplitCandidate> {
    if n < 2 * params.min_samples_leaf || params.max_depth.map_or(false, |d| depth >= d) {
        return None;
    }

    let l2 = params.l2_regularization;
    let parent_score = score(sum, n, l2);

    let per_feature: Vec<Option<SplitCandidate>> = (0..histogram.sums.len())
        .into_par_iter()
        .map(|f| {
            let sums = &histogram.sums[f];
            let counts = &histogram.counts[f];
            let mut best: Option<SplitCandidate> = None;
            let mut left_sum = 0.0;
            let mut left_count = 0usize;

            for b in 0..sums.len().saturating_sub(1) {
                left_sum += sums[b];
                left_count += counts[b];
                let right_count = n - left_count;
                if left_count < params.min_samples_leaf {
                    continue;
                }
                if right_count < params.min_samples_leaf {
                    break;
                }
                let gain = score(left_sum, left_count, l2)
                    + score(sum - left_sum, right_count, l2)
                    - parent_score;
                if gain > best.map_or(0.0, |c| c.gain) {
                    best = Some(SplitCandidate {
                        feature: f,
                        bin: b,
                        gain,
                        left_sum,
                        left_count,
                    });
                }
            }
            best
        })
        .collect();

    // Reduce in feature order so ties resolve to the lowest feature index
    per_feature
        .into_iter()
        .flatten()
        .fold(None, |best: Option<SplitCandidate>, c| match best {
            Some(b) if b.gain >= c.gain => Some(b),
            _ => Some(c),
        })
}
