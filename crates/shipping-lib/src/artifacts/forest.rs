//! Native random forest evaluation
//!
//! Trees are exported offline from the fitted estimator's `tree_` arrays and
//! evaluated in-process. A node is a leaf when its left child is `-1`;
//! otherwise a row goes left when `feature <= threshold`, comparing the
//! feature at f32 precision as the estimator does. The forest prediction is
//! the mean of the leaf values reached in every tree.

use super::{ArtifactSource, Regressor};
use crate::models::NUM_FEATURES;
use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;

const NO_CHILD: i64 = -1;

#[derive(Debug, Deserialize)]
struct ForestFile {
    #[serde(default)]
    n_features: Option<usize>,
    trees: Vec<TreeFile>,
}

#[derive(Debug, Deserialize)]
struct TreeFile {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<f64>,
}

/// Structure-of-arrays decision tree. Node 0 is the root.
#[derive(Debug, Clone)]
struct DecisionTree {
    split_features: Box<[usize]>,
    thresholds: Box<[f64]>,
    left_children: Box<[usize]>,
    right_children: Box<[usize]>,
    is_leaf: Box<[bool]>,
    leaf_values: Box<[f64]>,
}

impl DecisionTree {
    /// Validate the exported arrays. Children must point forward, which
    /// rules out cycles and guarantees traversal terminates.
    fn from_file(tree: TreeFile) -> Result<Self> {
        let n_nodes = tree.children_left.len();
        ensure!(n_nodes > 0, "tree has no nodes");
        for (name, len) in [
            ("children_right", tree.children_right.len()),
            ("feature", tree.feature.len()),
            ("threshold", tree.threshold.len()),
            ("value", tree.value.len()),
        ] {
            ensure!(
                len == n_nodes,
                "{} has {} entries, expected {}",
                name,
                len,
                n_nodes
            );
        }

        let mut split_features = Vec::with_capacity(n_nodes);
        let mut left_children = Vec::with_capacity(n_nodes);
        let mut right_children = Vec::with_capacity(n_nodes);
        let mut is_leaf = Vec::with_capacity(n_nodes);

        for node in 0..n_nodes {
            let (left, right) = (tree.children_left[node], tree.children_right[node]);

            if left == NO_CHILD {
                ensure!(right == NO_CHILD, "node {} has only a right child", node);
                ensure!(
                    tree.value[node].is_finite(),
                    "leaf {} has a non-finite value",
                    node
                );
                split_features.push(0);
                left_children.push(0);
                right_children.push(0);
                is_leaf.push(true);
                continue;
            }

            let child = |c: i64| -> Result<usize> {
                match usize::try_from(c) {
                    Ok(c) if c > node && c < n_nodes => Ok(c),
                    _ => bail!("node {} has invalid child {}", node, c),
                }
            };
            let feature = match usize::try_from(tree.feature[node]) {
                Ok(f) if f < NUM_FEATURES => f,
                _ => bail!(
                    "node {} splits on feature {}, expected 0..{}",
                    node,
                    tree.feature[node],
                    NUM_FEATURES
                ),
            };
            ensure!(
                !tree.threshold[node].is_nan(),
                "node {} has a NaN threshold",
                node
            );

            split_features.push(feature);
            left_children.push(child(left)?);
            right_children.push(child(right)?);
            is_leaf.push(false);
        }

        Ok(Self {
            split_features: split_features.into(),
            thresholds: tree.threshold.into(),
            left_children: left_children.into(),
            right_children: right_children.into(),
            is_leaf: is_leaf.into(),
            leaf_values: tree.value.into(),
        })
    }

    fn predict_row(&self, features: &[f64; NUM_FEATURES]) -> f64 {
        let mut idx = 0;
        while !self.is_leaf[idx] {
            let value = f64::from(features[self.split_features[idx]] as f32);
            idx = if value <= self.thresholds[idx] {
                self.left_children[idx]
            } else {
                self.right_children[idx]
            };
        }
        self.leaf_values[idx]
    }
}

/// Random forest regressor averaging its trees
#[derive(Debug, Clone)]
pub struct ForestRegressor {
    trees: Vec<DecisionTree>,
}

impl ForestRegressor {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let file: ForestFile =
            serde_json::from_slice(bytes).context("Failed to parse forest JSON")?;

        if let Some(n) = file.n_features {
            ensure!(
                n == NUM_FEATURES,
                "forest was fitted on {} features, expected {}",
                n,
                NUM_FEATURES
            );
        }
        ensure!(!file.trees.is_empty(), "forest has no trees");

        let trees = file
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| DecisionTree::from_file(t).with_context(|| format!("Invalid tree {}", i)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { trees })
    }

    pub fn load(source: &ArtifactSource) -> Result<Self> {
        let bytes = source.read()?;
        Self::from_json(&bytes).with_context(|| format!("Invalid model {}", source.path.display()))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for ForestRegressor {
    fn predict(&self, features: &[f64; NUM_FEATURES]) -> Result<f64> {
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two trees: one splits on num_items at 3.5, the other on total at 1000
    const FOREST_JSON: &str = r#"{
        "n_features": 5,
        "trees": [
            {
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [3, -2, -2],
                "threshold": [3.5, -2.0, -2.0],
                "value": [0.0, 140.0, 260.0]
            },
            {
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [1, -2, -2],
                "threshold": [1000.0, -2.0, -2.0],
                "value": [0.0, 160.0, 340.0]
            }
        ]
    }"#;

    fn row(total: f64, num_items: f64) -> [f64; NUM_FEATURES] {
        [0.0, total, 0.0, num_items, 0.0]
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = ForestRegressor::from_json(FOREST_JSON.as_bytes()).unwrap();
        assert_eq!(forest.n_trees(), 2);

        assert_eq!(forest.predict(&row(500.0, 2.0)).unwrap(), 150.0);
        assert_eq!(forest.predict(&row(500.0, 5.0)).unwrap(), 210.0);
        assert_eq!(forest.predict(&row(1500.0, 5.0)).unwrap(), 300.0);
    }

    #[test]
    fn test_threshold_is_inclusive_on_the_left() {
        let forest = ForestRegressor::from_json(FOREST_JSON.as_bytes()).unwrap();
        assert_eq!(forest.predict(&row(1000.0, 3.5)).unwrap(), 150.0);
    }

    #[test]
    fn test_single_leaf_tree() {
        let json = r#"{"trees": [{"children_left": [-1], "children_right": [-1],
            "feature": [-2], "threshold": [-2.0], "value": [42.5]}]}"#;
        let forest = ForestRegressor::from_json(json.as_bytes()).unwrap();
        assert_eq!(forest.predict(&[1.0; NUM_FEATURES]).unwrap(), 42.5);
    }

    #[test]
    fn test_rejects_malformed_trees() {
        let cases = [
            // no trees
            r#"{"trees": []}"#,
            // wrong feature count
            r#"{"n_features": 4, "trees": [{"children_left": [-1], "children_right": [-1],
                "feature": [-2], "threshold": [-2.0], "value": [1.0]}]}"#,
            // mismatched array lengths
            r#"{"trees": [{"children_left": [-1], "children_right": [-1, -1],
                "feature": [-2], "threshold": [-2.0], "value": [1.0]}]}"#,
            // child points backwards
            r#"{"trees": [{"children_left": [0, -1], "children_right": [1, -1],
                "feature": [0, -2], "threshold": [1.0, -2.0], "value": [0.0, 1.0]}]}"#,
            // child out of bounds
            r#"{"trees": [{"children_left": [1, -1], "children_right": [7, -1],
                "feature": [0, -2], "threshold": [1.0, -2.0], "value": [0.0, 1.0]}]}"#,
            // split on a feature the vector does not have
            r#"{"trees": [{"children_left": [1, -1, -1], "children_right": [2, -1, -1],
                "feature": [5, -2, -2], "threshold": [1.0, -2.0, -2.0], "value": [0.0, 1.0, 2.0]}]}"#,
        ];

        for json in cases {
            assert!(ForestRegressor::from_json(json.as_bytes()).is_err(), "{}", json);
        }
    }

    #[test]
    fn test_missing_file_fails_to_load() {
        let source = ArtifactSource::new("/nonexistent/randomforest_model.json");
        let err = ForestRegressor::load(&source).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read"));
    }
}
