use std::io::Read;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use super::dispatcher::{
    format_rupees, ContractViolation, DecisionDispatcher, DispatchError, Outcome,
};
use super::domain::{InputError, RawApplication};
use super::features::{DerivedRatios, FeatureEncoder, FeatureVector};
use super::models::{AffordabilityRegressor, EligibilityClassifier, ModelError};

/// Rendered result of one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub outcome: Outcome,
    pub ratios: DerivedRatios,
    pub assessed_at: DateTime<Utc>,
}

impl Assessment {
    pub fn view(&self) -> AssessmentView {
        AssessmentView {
            decision: self.outcome.label(),
            message: self.outcome.message(),
            emi_amount: self.outcome.emi_amount(),
            emi_amount_display: self.outcome.emi_amount().map(format_rupees),
            ratios: self.ratios,
            assessed_at: self.assessed_at,
        }
    }
}

/// Public payload for an assessment.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentView {
    pub decision: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emi_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emi_amount_display: Option<String>,
    pub ratios: DerivedRatios,
    pub assessed_at: DateTime<Utc>,
}

/// One CSV row's result. Row numbers are 1-based and exclude the header.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRow {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<AssessmentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("invalid input: {0}")]
    MalformedInput(#[from] serde_json::Error),
    #[error(transparent)]
    ContractViolation(#[from] ContractViolation),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("batch input could not be read: {0}")]
    Csv(#[from] csv::Error),
}

impl From<DispatchError> for AssessmentError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::ContractViolation(violation) => Self::ContractViolation(violation),
            DispatchError::Model(err) => Self::Model(err),
        }
    }
}

/// Service composing the feature encoder and the decision dispatcher.
pub struct EmiAssessmentService<C, R> {
    encoder: FeatureEncoder,
    dispatcher: DecisionDispatcher<C, R>,
}

impl<C, R> EmiAssessmentService<C, R>
where
    C: EligibilityClassifier + 'static,
    R: AffordabilityRegressor + 'static,
{
    pub fn new(classifier: Arc<C>, regressor: Arc<R>) -> Self {
        Self {
            encoder: FeatureEncoder,
            dispatcher: DecisionDispatcher::new(classifier, regressor),
        }
    }

    pub fn encode(&self, application: &RawApplication) -> Result<FeatureVector, AssessmentError> {
        Ok(self.encoder.encode(application)?)
    }

    /// Encode, classify and, for eligible applicants, predict the affordable EMI.
    pub fn assess(&self, application: &RawApplication) -> Result<Assessment, AssessmentError> {
        let features = self.encode(application)?;
        let outcome = self.dispatcher.dispatch(&features)?;

        info!(
            decision = outcome.label(),
            emi_amount = ?outcome.emi_amount(),
            "assessment completed"
        );

        Ok(Assessment {
            outcome,
            ratios: DerivedRatios::from_application(application),
            assessed_at: Utc::now(),
        })
    }

    /// Assess every row of a CSV whose headers are the application field names. A row with
    /// bad values is reported on its own; unreadable CSV structure aborts the batch.
    pub fn assess_csv<Rd: Read>(&self, reader: Rd) -> Result<Vec<BatchRow>, AssessmentError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = Vec::new();

        for (index, record) in csv_reader.deserialize::<RawApplication>().enumerate() {
            let row = index + 1;
            let application = match record {
                Ok(application) => application,
                Err(err) if matches!(err.kind(), csv::ErrorKind::Deserialize { .. }) => {
                    warn!(row, error = %err, "skipping unparseable batch row");
                    rows.push(BatchRow {
                        row,
                        assessment: None,
                        error: Some(format!("invalid input: {err}")),
                    });
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let result = match self.assess(&application) {
                Ok(assessment) => BatchRow {
                    row,
                    assessment: Some(assessment.view()),
                    error: None,
                },
                Err(err @ AssessmentError::InvalidInput(_)) => {
                    warn!(row, error = %err, "batch row rejected");
                    BatchRow {
                        row,
                        assessment: None,
                        error: Some(err.to_string()),
                    }
                }
                Err(err) => {
                    error!(row, error = %err, "batch row assessment failed");
                    BatchRow {
                        row,
                        assessment: None,
                        error: Some("assessment failed".to_string()),
                    }
                }
            };
            rows.push(result);
        }

        info!(rows = rows.len(), "batch assessment completed");
        Ok(rows)
    }
}
