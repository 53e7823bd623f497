//! Shared fixtures: a tiny training set, the pipeline fitted on it and a
//! hand-built two-tree forest over the resulting feature columns.

#![allow(dead_code)]

use skuwatch_core::stages::{
    AspectRatio, ColumnDropper, GroupMeanDifference, HierarchyAggregator, LogDensityVolume,
    PricePerGram,
};
use skuwatch_core::{
    Cell, Classifier, DataBatch, DecisionTree, ModelArtifact, Pipeline, ProductInput,
};

pub const FEATURE_COLUMNS: [&str; 18] = [
    "Count Category",
    "Price In Dollar",
    "Length",
    "Width",
    "Height",
    "Final Weights in Grams",
    "Price In Dollar_diff_from_group_mean",
    "log_volume",
    "log_density_proxy",
    "log_final_weight",
    "density_proxy",
    "price_per_gram",
    "L_by_W",
    "L_by_H",
    "W_by_H",
    "Hierarchy_Weight_Mean",
    "Hierarchy_Price_Std",
    "Hierarchy_Count",
];

pub fn feature_columns() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

pub fn training_batch() -> DataBatch {
    let row = |cat: i64, price: f64, l: f64, w: f64, h: f64, weight: f64, hier: &str| {
        vec![
            Cell::Int(cat),
            Cell::Float(price),
            Cell::Float(l),
            Cell::Float(w),
            Cell::Float(h),
            Cell::Float(weight),
            Cell::from(hier),
        ]
    };
    DataBatch::from_rows(
        [
            "Count Category",
            "Price In Dollar",
            "Length",
            "Width",
            "Height",
            "Final Weights in Grams",
            "Hierarchy",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect(),
        vec![
            row(1, 20.0, 10.0, 5.0, 2.0, 100.0, "A"),
            row(1, 30.0, 12.0, 6.0, 3.0, 150.0, "A"),
            row(2, 200.0, 40.0, 30.0, 20.0, 5000.0, "B"),
            row(2, 180.0, 35.0, 25.0, 20.0, 4500.0, "B"),
            row(3, 5.0, 4.0, 4.0, 4.0, 40.0, "C"),
        ],
    )
    .expect("fixture batch is well formed")
}

pub fn unfitted_pipeline() -> Pipeline {
    Pipeline::new()
        .add_step("price_group_diff", GroupMeanDifference::default())
        .add_step("density", LogDensityVolume::default())
        .add_step("price_per_gram", PricePerGram::default())
        .add_step("aspect_ratio", AspectRatio::default())
        .add_step("hierarchy_agg", HierarchyAggregator::default())
        .add_step("drop_text", ColumnDropper::new(["Hierarchy"]))
}

pub fn fitted_pipeline() -> Pipeline {
    let mut pipeline = unfitted_pipeline();
    pipeline
        .fit(training_batch(), None)
        .expect("fixture pipeline fits");
    pipeline
}

fn tree(feature: [i64; 2], threshold: [f64; 2], leaves: [[f64; 2]; 3]) -> DecisionTree {
    DecisionTree {
        children_left: vec![1, -1, 3, -1, -1],
        children_right: vec![2, -1, 4, -1, -1],
        feature: vec![feature[0], -2, feature[1], -2, -2],
        threshold: vec![threshold[0], -2.0, threshold[1], -2.0, -2.0],
        value: vec![
            vec![1.0, 1.0],
            leaves[0].to_vec(),
            vec![1.0, 1.0],
            leaves[1].to_vec(),
            leaves[2].to_vec(),
        ],
    }
}

/// Tree 1 splits on `price_per_gram` then `density_proxy`; tree 2 on
/// `Hierarchy_Count` then the price difference from the category mean.
pub fn forest() -> Classifier {
    Classifier::RandomForest {
        classes: vec![0, 1],
        trees: vec![
            tree([11, 10], [1.0, 5.0], [[9.0, 1.0], [2.0, 3.0], [0.0, 6.0]]),
            tree([17, 6], [0.5, 50.0], [[1.0, 4.0], [8.0, 2.0], [1.0, 5.0]]),
        ],
    }
}

pub fn demo_artifact() -> ModelArtifact {
    ModelArtifact::new(fitted_pipeline(), forest(), feature_columns())
        .expect("fixture artifact is valid")
}

pub fn reference_input() -> ProductInput {
    ProductInput {
        count_category: 1,
        price_in_dollar: 25.0,
        length: 10.0,
        width: 5.0,
        height: 2.0,
        final_weights_in_grams: 100.0,
        hierarchy: "A".into(),
    }
}

pub fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}
