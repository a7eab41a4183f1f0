use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::features::FeatureVector;
use super::models::{AffordabilityRegressor, EligibilityClassifier, ModelError};

/// Risk class reported by the eligibility classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityClass {
    Eligible,
    HighRisk,
    NotEligible,
}

impl EligibilityClass {
    pub const fn code(self) -> i64 {
        match self {
            Self::Eligible => 0,
            Self::HighRisk => 1,
            Self::NotEligible => 2,
        }
    }
}

impl TryFrom<i64> for EligibilityClass {
    type Error = DispatchError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Eligible),
            1 => Ok(Self::HighRisk),
            2 => Ok(Self::NotEligible),
            other => Err(DispatchError::ContractViolation(
                ContractViolation::UnknownClass(other),
            )),
        }
    }
}

/// Result of one submission. Produced once, rendered, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Outcome {
    NotEligible,
    HighRisk,
    #[serde(rename = "eligible")]
    EligibleWithEmi { amount: f64 },
}

impl Outcome {
    pub const fn label(&self) -> &'static str {
        match self {
            Outcome::NotEligible => "not_eligible",
            Outcome::HighRisk => "high_risk",
            Outcome::EligibleWithEmi { .. } => "eligible",
        }
    }

    pub fn emi_amount(&self) -> Option<f64> {
        match self {
            Outcome::EligibleWithEmi { amount } => Some(*amount),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Outcome::NotEligible => {
                "You are Not Eligible for EMI based on your financial profile.".to_string()
            }
            Outcome::HighRisk => {
                "You are in the High Risk category. EMI approval may be uncertain.".to_string()
            }
            Outcome::EligibleWithEmi { amount } => format!(
                "Congratulations! You are Eligible for EMI. You can safely afford an EMI of {} per month.",
                format_rupees(*amount)
            ),
        }
    }
}

/// Render an amount as rupees with thousands separators and two decimals.
pub fn format_rupees(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}₹{grouped}.{fraction}")
}

/// A model artifact answered outside its documented range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractViolation {
    #[error("classifier returned class {0}, expected 0, 1 or 2")]
    UnknownClass(i64),
    #[error("regressor returned a non-finite amount ({0})")]
    NonFiniteAmount(f64),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("model contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Runs the classifier and, only for eligible applicants, the regressor.
pub struct DecisionDispatcher<C, R> {
    classifier: Arc<C>,
    regressor: Arc<R>,
}

impl<C, R> Clone for DecisionDispatcher<C, R> {
    fn clone(&self) -> Self {
        Self {
            classifier: Arc::clone(&self.classifier),
            regressor: Arc::clone(&self.regressor),
        }
    }
}

impl<C, R> DecisionDispatcher<C, R>
where
    C: EligibilityClassifier,
    R: AffordabilityRegressor,
{
    pub fn new(classifier: Arc<C>, regressor: Arc<R>) -> Self {
        Self {
            classifier,
            regressor,
        }
    }

    pub fn dispatch(&self, features: &FeatureVector) -> Result<Outcome, DispatchError> {
        let raw_class = self.classifier.classify(features)?;
        let class = EligibilityClass::try_from(raw_class).inspect_err(|_| {
            warn!(class = raw_class, "classifier answered outside its contract");
        })?;
        debug!(?class, "application classified");

        let outcome = match class {
            EligibilityClass::NotEligible => Outcome::NotEligible,
            EligibilityClass::HighRisk => Outcome::HighRisk,
            EligibilityClass::Eligible => {
                let amount = self.regressor.regress(features)?;
                if !amount.is_finite() {
                    warn!(amount, "regressor answered outside its contract");
                    return Err(ContractViolation::NonFiniteAmount(amount).into());
                }
                Outcome::EligibleWithEmi { amount }
            }
        };

        debug!(decision = outcome.label(), "application resolved");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_rupees_with_grouping() {
        assert_eq!(format_rupees(5000.0), "₹5,000.00");
        assert_eq!(format_rupees(1234567.891), "₹1,234,567.89");
        assert_eq!(format_rupees(999.999), "₹1,000.00");
        assert_eq!(format_rupees(12.5), "₹12.50");
        assert_eq!(format_rupees(-2500.0), "-₹2,500.00");
    }

    #[test]
    fn class_codes_round_trip() {
        for class in [
            EligibilityClass::Eligible,
            EligibilityClass::HighRisk,
            EligibilityClass::NotEligible,
        ] {
            assert_eq!(
                EligibilityClass::try_from(class.code()).expect("known class"),
                class
            );
        }
        assert!(matches!(
            EligibilityClass::try_from(3_i64),
            Err(DispatchError::ContractViolation(
                ContractViolation::UnknownClass(3)
            ))
        ));
    }

    #[test]
    fn outcome_serializes_with_decision_tag() {
        let value = serde_json::to_value(Outcome::EligibleWithEmi { amount: 5000.0 })
            .expect("serializes");
        assert_eq!(value["decision"], "eligible");
        assert_eq!(value["amount"], 5000.0);

        let value = serde_json::to_value(Outcome::HighRisk).expect("serializes");
        assert_eq!(value["decision"], "high_risk");
    }

    #[test]
    fn messages_mirror_form_copy() {
        assert!(Outcome::NotEligible.message().contains("Not Eligible"));
        assert!(Outcome::HighRisk.message().contains("High Risk"));
        let eligible = Outcome::EligibleWithEmi { amount: 12345.678 }.message();
        assert!(eligible.contains("₹12,345.68"));
    }
}
