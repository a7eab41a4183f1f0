use serde::{Deserialize, Serialize};

use crate::eligibility::features::FEATURE_COUNT;

/// How tree outputs are combined: boosted ensembles sum, forests average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
}

/// A node of a binary decision tree. Splits send `value <= threshold` left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    // Children always point forward (checked at load), so the walk terminates.
    fn leaf_for(&self, features: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { leaf } => return leaf,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    fn validate(&self, position: usize, outputs: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err(format!("tree {position} has no nodes"));
        }

        let node_count = self.nodes.len();
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(format!(
                            "tree {position} node {index} splits on feature {feature}, schema has {FEATURE_COUNT}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!(
                            "tree {position} node {index} has a non-finite threshold"
                        ));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= node_count {
                            return Err(format!(
                                "tree {position} node {index} has invalid child {child}"
                            ));
                        }
                    }
                }
                TreeNode::Leaf { leaf } => {
                    if leaf.len() != outputs {
                        return Err(format!(
                            "tree {position} node {index} has {} outputs, expected {outputs}",
                            leaf.len()
                        ));
                    }
                    if leaf.iter().any(|value| !value.is_finite()) {
                        return Err(format!(
                            "tree {position} node {index} has a non-finite leaf value"
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    fn first_leaf_width(&self) -> Option<usize> {
        self.nodes.iter().find_map(|node| match node {
            TreeNode::Leaf { leaf } => Some(leaf.len()),
            TreeNode::Split { .. } => None,
        })
    }
}

/// Trained estimator parameters. Produces one score per output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    /// One coefficient row and intercept per output.
    Linear {
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    },
    TreeEnsemble {
        trees: Vec<Tree>,
        #[serde(default)]
        base_score: Vec<f64>,
        #[serde(default)]
        aggregation: Aggregation,
    },
}

impl Estimator {
    pub fn outputs(&self) -> usize {
        match self {
            Estimator::Linear { intercepts, .. } => intercepts.len(),
            Estimator::TreeEnsemble { trees, .. } => trees
                .first()
                .and_then(Tree::first_leaf_width)
                .unwrap_or(0),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        let outputs = self.outputs();
        if outputs == 0 {
            return Err("estimator produces no outputs".to_string());
        }

        match self {
            Estimator::Linear {
                coefficients,
                intercepts,
            } => {
                if coefficients.len() != intercepts.len() {
                    return Err(format!(
                        "{} coefficient rows for {} intercepts",
                        coefficients.len(),
                        intercepts.len()
                    ));
                }
                for (row, weights) in coefficients.iter().enumerate() {
                    if weights.len() != FEATURE_COUNT {
                        return Err(format!(
                            "coefficient row {row} has {} weights, expected {FEATURE_COUNT}",
                            weights.len()
                        ));
                    }
                }
                let all_finite = coefficients
                    .iter()
                    .flatten()
                    .chain(intercepts.iter())
                    .all(|value| value.is_finite());
                if !all_finite {
                    return Err("linear parameters must be finite".to_string());
                }
            }
            Estimator::TreeEnsemble {
                trees, base_score, ..
            } => {
                if !base_score.is_empty() && base_score.len() != outputs {
                    return Err(format!(
                        "base_score has {} entries, expected {outputs}",
                        base_score.len()
                    ));
                }
                if base_score.iter().any(|value| !value.is_finite()) {
                    return Err("base_score must be finite".to_string());
                }
                for (position, tree) in trees.iter().enumerate() {
                    tree.validate(position, outputs)?;
                }
            }
        }

        Ok(())
    }

    /// Scores for a schema-ordered feature slice. Callers pass exactly `FEATURE_COUNT` values.
    pub(crate) fn predict(&self, features: &[f64]) -> Vec<f64> {
        match self {
            Estimator::Linear {
                coefficients,
                intercepts,
            } => coefficients
                .iter()
                .zip(intercepts)
                .map(|(weights, intercept)| {
                    weights
                        .iter()
                        .zip(features)
                        .map(|(weight, value)| weight * value)
                        .sum::<f64>()
                        + intercept
                })
                .collect(),
            Estimator::TreeEnsemble {
                trees,
                base_score,
                aggregation,
            } => {
                let outputs = self.outputs();
                let mut scores = vec![0.0; outputs];
                for tree in trees {
                    for (score, value) in scores.iter_mut().zip(tree.leaf_for(features)) {
                        *score += value;
                    }
                }
                if *aggregation == Aggregation::Mean {
                    let count = trees.len() as f64;
                    for score in &mut scores {
                        *score /= count;
                    }
                }
                for (score, offset) in scores.iter_mut().zip(base_score) {
                    *score += offset;
                }
                scores
            }
        }
    }
}
