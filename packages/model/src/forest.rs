//! Random forest classifier loaded from a JSON artifact.
//!
//! Each tree is a flat node list rooted at index 0. Split nodes send a
//! sample left when `features[feature] <= threshold` and right otherwise,
//! so `NaN` features always go right. Leaves hold per-class weights that
//! are normalized before averaging across trees.

use serde::{Deserialize, Serialize};

use crate::classifier::{Classifier, ClassifierError};

/// Structural problems in a forest artifact.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForestError {
    /// The forest has no labels.
    #[error("Forest has no labels")]
    NoLabels,

    /// The forest has no trees.
    #[error("Forest has no trees")]
    NoTrees,

    /// A tree has no nodes.
    #[error("Tree {tree} has no nodes")]
    EmptyTree {
        /// Tree index.
        tree: usize,
    },

    /// A split references a feature past `n_features`.
    #[error("Tree {tree} node {node}: feature {feature} out of range ({n_features} features)")]
    FeatureOutOfRange {
        /// Tree index.
        tree: usize,
        /// Node index.
        node: usize,
        /// Referenced feature.
        feature: usize,
        /// Declared feature count.
        n_features: usize,
    },

    /// A split child does not point forward to an existing node.
    #[error("Tree {tree} node {node}: child {child} is not a later node")]
    BadChild {
        /// Tree index.
        tree: usize,
        /// Node index.
        node: usize,
        /// Offending child index.
        child: usize,
    },

    /// A leaf's distribution length differs from the label count.
    #[error("Tree {tree} node {node}: {actual} class weights for {expected} labels")]
    LeafShape {
        /// Tree index.
        tree: usize,
        /// Node index.
        node: usize,
        /// Label count.
        expected: usize,
        /// Distribution length.
        actual: usize,
    },

    /// A leaf's weights are negative, non-finite, or sum to zero.
    #[error("Tree {tree} node {node}: class weights must be non-negative with a positive sum")]
    LeafWeights {
        /// Tree index.
        tree: usize,
        /// Node index.
        node: usize,
    },
}

/// A node of a decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// Internal decision node.
    Split {
        /// Feature index tested.
        feature: usize,
        /// Samples with `value <= threshold` go left.
        threshold: f64,
        /// Left child index.
        left: usize,
        /// Right child index.
        right: usize,
    },
    /// Terminal node.
    Leaf {
        /// Per-class weights (sample counts or fractions).
        distribution: Vec<f64>,
    },
}

/// A single decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Nodes; index 0 is the root.
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Class weights of the leaf reached by `features`.
    ///
    /// Assumes the tree was validated against `features.len()`.
    fn leaf(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { distribution } => return distribution,
            }
        }
    }
}

/// A random forest: the mean of its trees' normalized leaf
/// distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestClassifier {
    /// Ordered label vocabulary.
    pub labels: Vec<String>,
    /// Number of input features.
    pub n_features: usize,
    /// The trees.
    pub trees: Vec<DecisionTree>,
}

impl ForestClassifier {
    /// Checks the structural invariants inference relies on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ForestError`] found.
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.labels.is_empty() {
            return Err(ForestError::NoLabels);
        }
        if self.trees.is_empty() {
            return Err(ForestError::NoTrees);
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ForestError::EmptyTree { tree: t });
            }

            for (n, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= self.n_features {
                            return Err(ForestError::FeatureOutOfRange {
                                tree: t,
                                node: n,
                                feature: *feature,
                                n_features: self.n_features,
                            });
                        }
                        // Children strictly after their parent rule out cycles.
                        for child in [*left, *right] {
                            if child <= n || child >= tree.nodes.len() {
                                return Err(ForestError::BadChild {
                                    tree: t,
                                    node: n,
                                    child,
                                });
                            }
                        }
                    }
                    TreeNode::Leaf { distribution } => {
                        if distribution.len() != self.labels.len() {
                            return Err(ForestError::LeafShape {
                                tree: t,
                                node: n,
                                expected: self.labels.len(),
                                actual: distribution.len(),
                            });
                        }
                        let valid = distribution.iter().all(|w| w.is_finite() && *w >= 0.0)
                            && distribution.iter().sum::<f64>() > 0.0;
                        if !valid {
                            return Err(ForestError::LeafWeights { tree: t, node: n });
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl Classifier for ForestClassifier {
    fn predict_probabilities(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        if features.len() != self.n_features {
            return Err(ClassifierError::FeatureCount {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let mut probabilities = vec![0.0; self.labels.len()];
        for tree in &self.trees {
            let leaf = tree.leaf(features);
            let total: f64 = leaf.iter().sum();
            for (p, w) in probabilities.iter_mut().zip(leaf) {
                *p += w / total;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let n_trees = self.trees.len() as f64;
        for p in &mut probabilities {
            *p /= n_trees;
        }

        Ok(probabilities)
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}
