//! The model artifact: fitted pipeline, classifier and feature column list.

use crate::error::ArtifactError;
use crate::model::Classifier;
use crate::pipeline::Pipeline;
use crate::stages::FeatureStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Provenance recorded by the training side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Bundle loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub pipeline: Pipeline,
    pub model: Classifier,
    pub feature_columns: Vec<String>,
    #[serde(default)]
    pub metadata: ArtifactMetadata,
}

impl ModelArtifact {
    /// Assemble and validate an artifact. Every stage is marked fitted.
    pub fn new(
        mut pipeline: Pipeline,
        model: Classifier,
        feature_columns: Vec<String>,
    ) -> Result<Self, ArtifactError> {
        pipeline.mark_all_fitted();
        let artifact = Self {
            pipeline,
            model,
            feature_columns,
            metadata: ArtifactMetadata::default(),
        };
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn with_metadata(mut self, metadata: ArtifactMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Load the artifact from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut artifact: Self =
            serde_json::from_str(&content).map_err(|source| ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        // Stateless stages never record a fitted flag during training.
        let patched = artifact.pipeline.mark_all_fitted();
        artifact.validate()?;

        tracing::info!(
            path = %path.display(),
            stages = artifact.pipeline.len(),
            patched_stages = patched,
            features = artifact.feature_columns.len(),
            classifier = artifact.model.kind(),
            "Loaded model artifact"
        );
        Ok(artifact)
    }

    /// Write the artifact as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.feature_columns.is_empty() {
            return Err(ArtifactError::invalid("feature column list is empty"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self
            .feature_columns
            .iter()
            .find(|c| !seen.insert(c.as_str()))
        {
            return Err(ArtifactError::invalid(format!(
                "feature column '{dup}' is listed twice"
            )));
        }
        if !self.pipeline.is_fitted() {
            return Err(ArtifactError::invalid("pipeline has unfitted stages"));
        }
        self.model.validate(self.feature_columns.len())?;
        Ok(())
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            stages: self
                .pipeline
                .steps()
                .iter()
                .map(|step| StageSummary {
                    name: step.name.clone(),
                    kind: step.stage.name().to_string(),
                    fitted: step.stage.is_fitted(),
                    learned_entries: step.stage.learned_entries(),
                })
                .collect(),
            classifier: self.model.kind().to_string(),
            classes: self.model.classes().to_vec(),
            feature_columns: self.feature_columns.clone(),
            trained_at: self.metadata.trained_at,
        }
    }
}

/// Report of an artifact's contents.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub stages: Vec<StageSummary>,
    pub classifier: String,
    pub classes: Vec<i64>,
    pub feature_columns: Vec<String>,
    pub trained_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub name: String,
    pub kind: String,
    pub fitted: bool,
    pub learned_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DecisionTree;
    use crate::stages::{ColumnDropper, PricePerGram};
    use std::io::Write;

    fn tree_on_feature_0() -> Classifier {
        Classifier::DecisionTree {
            classes: vec![0, 1],
            tree: DecisionTree {
                children_left: vec![1, -1, -1],
                children_right: vec![2, -1, -1],
                feature: vec![0, -2, -2],
                threshold: vec![1.0, -2.0, -2.0],
                value: vec![vec![2.0, 2.0], vec![2.0, 0.0], vec![0.0, 2.0]],
            },
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new()
            .add_step("ppg", PricePerGram::default())
            .add_step("drop", ColumnDropper::new(["Hierarchy"]))
    }

    #[test]
    fn test_new_marks_stages_fitted() {
        let artifact =
            ModelArtifact::new(pipeline(), tree_on_feature_0(), vec!["price_per_gram".into()])
                .unwrap();
        assert!(artifact.pipeline.is_fitted());
        let summary = artifact.summary();
        assert_eq!(summary.stages.len(), 2);
        assert_eq!(summary.stages[0].kind, "price_per_gram");
        assert_eq!(summary.classes, vec![0, 1]);
    }

    #[test]
    fn test_rejects_duplicate_feature_columns() {
        let err = ModelArtifact::new(
            pipeline(),
            tree_on_feature_0(),
            vec!["a".into(), "a".into()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn test_rejects_empty_feature_columns() {
        let err = ModelArtifact::new(pipeline(), tree_on_feature_0(), vec![]).unwrap_err();
        assert!(matches!(err, ArtifactError::Invalid { .. }));
    }

    #[test]
    fn test_load_patches_missing_fitted_flags() {
        let json = serde_json::json!({
            "pipeline": {"steps": [
                {"name": "ppg", "stage": {"type": "price_per_gram"}}
            ]},
            "model": serde_json::to_value(tree_on_feature_0()).unwrap(),
            "feature_columns": ["price_per_gram"]
        });
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", json).unwrap();

        let artifact = ModelArtifact::load(file.path()).unwrap();
        assert!(artifact.pipeline.steps()[0].stage.is_fitted());
        assert_eq!(artifact.metadata, ArtifactMetadata::default());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ModelArtifact::load("/nonexistent/model_artifact.json").unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    #[test]
    fn test_load_unknown_stage_type() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"pipeline": {{"steps": [{{"name": "x", "stage": {{"type": "mystery"}}}}]}},
                "model": {{"type": "decision_tree", "classes": [0], "tree": {{}}}},
                "feature_columns": ["a"]}}"#
        )
        .unwrap();
        let err = ModelArtifact::load(file.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.json");
        let artifact =
            ModelArtifact::new(pipeline(), tree_on_feature_0(), vec!["price_per_gram".into()])
                .unwrap()
                .with_metadata(ArtifactMetadata {
                    trained_at: None,
                    description: Some("unit test".into()),
                });
        artifact.save(&path).unwrap();
        assert_eq!(ModelArtifact::load(&path).unwrap(), artifact);
    }
}
