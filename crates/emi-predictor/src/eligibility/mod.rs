//! EMI eligibility assessment: raw form input is encoded into the fixed feature layout,
//! classified, and, for eligible applicants only, priced by the affordability regressor.

pub mod dispatcher;
pub mod domain;
pub mod features;
pub mod models;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use dispatcher::{
    format_rupees, ContractViolation, DecisionDispatcher, DispatchError, EligibilityClass,
    Outcome,
};
pub use domain::{
    CompanyType, Education, EmiScenario, EmploymentType, FieldBounds, Gender, HouseType,
    InputError, MaritalStatus, RawApplication, NUMERIC_BOUNDS,
};
pub use features::{
    DerivedRatios, FeatureColumn, FeatureEncoder, FeatureVector, FEATURE_COUNT, FEATURE_SCHEMA,
};
pub use models::{
    load_models, AffordabilityRegressor, EligibilityClassifier, JsonClassifier, JsonRegressor,
    LoadedModels, ModelError, ModelLoadError,
};
pub use router::assessment_router;
pub use service::{Assessment, AssessmentError, AssessmentView, BatchRow, EmiAssessmentService};
