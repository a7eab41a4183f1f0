use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::estimator::Estimator;
use super::{AffordabilityRegressor, EligibilityClassifier, ModelError};
use crate::eligibility::features::{FeatureVector, FEATURE_SCHEMA};

/// On-disk layout shared by both artifacts. `classes` is present only for classifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDocument {
    #[serde(default)]
    pub name: Option<String>,
    pub feature_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<i64>>,
    pub estimator: Estimator,
}

/// Any reason an artifact cannot be used. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("model artifact {path} could not be read: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("model artifact {path} is unusable: {detail}")]
    Invalid { path: PathBuf, detail: String },
}

fn read_document<R: Read>(reader: R, path: &Path) -> Result<ArtifactDocument, ModelLoadError> {
    serde_json::from_reader(reader).map_err(|source| ModelLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn open(path: &Path) -> Result<BufReader<File>, ModelLoadError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn check_schema(document: &ArtifactDocument) -> Result<(), String> {
    if document.feature_names.len() != FEATURE_SCHEMA.len() {
        return Err(format!(
            "artifact expects {} features, the encoder produces {}",
            document.feature_names.len(),
            FEATURE_SCHEMA.len()
        ));
    }

    let mismatch = document
        .feature_names
        .iter()
        .zip(FEATURE_SCHEMA)
        .enumerate()
        .find(|(_, (artifact, schema))| artifact.as_str() != *schema);
    if let Some((index, (artifact, schema))) = mismatch {
        return Err(format!(
            "feature {index} is '{artifact}' in the artifact but '{schema}' in the encoder"
        ));
    }

    document.estimator.validate()
}

fn display_name(document: &ArtifactDocument, path: &Path) -> String {
    document.name.clone().unwrap_or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string())
    })
}

fn first_duplicate(classes: &[i64]) -> Option<i64> {
    classes
        .iter()
        .enumerate()
        .find(|(index, class)| classes[..*index].contains(class))
        .map(|(_, class)| *class)
}

/// Eligibility classifier backed by a JSON artifact. Predicts the highest scoring class label.
#[derive(Debug, Clone)]
pub struct JsonClassifier {
    name: String,
    classes: Vec<i64>,
    estimator: Estimator,
}

impl JsonClassifier {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        Self::from_reader(open(path)?, path)
    }

    /// `origin` names the source in error messages and provides the fallback model name.
    pub fn from_reader<R: Read>(reader: R, origin: &Path) -> Result<Self, ModelLoadError> {
        let document = read_document(reader, origin)?;
        Self::from_document(document, origin)
    }

    pub fn from_document(document: ArtifactDocument, origin: &Path) -> Result<Self, ModelLoadError> {
        let invalid = |detail: String| ModelLoadError::Invalid {
            path: origin.to_path_buf(),
            detail,
        };

        check_schema(&document).map_err(invalid)?;

        let classes = match &document.classes {
            Some(classes) if !classes.is_empty() => classes.clone(),
            _ => return Err(invalid("classifier artifact lists no classes".to_string())),
        };
        if let Some(duplicate) = first_duplicate(&classes) {
            return Err(invalid(format!("class {duplicate} is listed more than once")));
        }
        if classes.len() != document.estimator.outputs() {
            return Err(invalid(format!(
                "{} classes but the estimator produces {} scores",
                classes.len(),
                document.estimator.outputs()
            )));
        }

        Ok(Self {
            name: display_name(&document, origin),
            classes,
            estimator: document.estimator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }
}

impl EligibilityClassifier for JsonClassifier {
    fn classify(&self, features: &FeatureVector) -> Result<i64, ModelError> {
        let scores = self.estimator.predict(features.as_slice());

        let mut best: Option<(usize, f64)> = None;
        for (index, score) in scores.into_iter().enumerate() {
            if score.is_nan() {
                return Err(ModelError::Prediction {
                    model: self.name.clone(),
                    reason: format!("class {} scored NaN", self.classes[index]),
                });
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((index, score)),
            }
        }

        best.map(|(index, _)| self.classes[index])
            .ok_or_else(|| ModelError::Prediction {
                model: self.name.clone(),
                reason: "no class scores produced".to_string(),
            })
    }
}

/// Affordability regressor backed by a JSON artifact with a single output.
#[derive(Debug, Clone)]
pub struct JsonRegressor {
    name: String,
    estimator: Estimator,
}

impl JsonRegressor {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        Self::from_reader(open(path)?, path)
    }

    pub fn from_reader<R: Read>(reader: R, origin: &Path) -> Result<Self, ModelLoadError> {
        let document = read_document(reader, origin)?;
        Self::from_document(document, origin)
    }

    pub fn from_document(document: ArtifactDocument, origin: &Path) -> Result<Self, ModelLoadError> {
        let invalid = |detail: String| ModelLoadError::Invalid {
            path: origin.to_path_buf(),
            detail,
        };

        check_schema(&document).map_err(invalid)?;

        if document.classes.is_some() {
            return Err(invalid(
                "regressor artifact must not list classes".to_string(),
            ));
        }
        if document.estimator.outputs() != 1 {
            return Err(invalid(format!(
                "regressor must produce one output, found {}",
                document.estimator.outputs()
            )));
        }

        Ok(Self {
            name: display_name(&document, origin),
            estimator: document.estimator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl AffordabilityRegressor for JsonRegressor {
    fn regress(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        self.estimator
            .predict(features.as_slice())
            .first()
            .copied()
            .ok_or_else(|| ModelError::Prediction {
                model: self.name.clone(),
                reason: "no output produced".to_string(),
            })
    }
}
