//! Raw application to model input: categorical encoding, derived ratios, and reindexing
//! onto the fixed column layout the model artifacts were trained against.

use serde::Serialize;
use tracing::debug;

use super::domain::{
    CompanyType, EmiScenario, EmploymentType, Gender, HouseType, InputError, MaritalStatus,
    RawApplication,
};

pub const FEATURE_COUNT: usize = 33;

/// Column order expected by both model artifacts.
pub const FEATURE_SCHEMA: [&str; FEATURE_COUNT] = [
    "age",
    "gender",
    "marital_status",
    "education",
    "monthly_salary",
    "years_of_employment",
    "monthly_rent",
    "family_size",
    "dependents",
    "existing_loans",
    "current_emi_amount",
    "credit_score",
    "bank_balance",
    "emergency_fund",
    "requested_amount",
    "requested_tenure",
    "debt_to_income",
    "total_expenses",
    "expense_to_income",
    "affordability_ratio",
    "emp_stability",
    "employment_type_Private",
    "employment_type_Self-Employed",
    "company_type_Mid-Size",
    "company_type_Mnc",
    "company_type_Small",
    "company_type_Startup",
    "house_type_Own",
    "house_type_Rented",
    "emi_scenario_Education Emi",
    "emi_scenario_Home Appliances Emi",
    "emi_scenario_Personal Loan Emi",
    "emi_scenario_Vehicle Emi",
];

pub fn schema_index(name: &str) -> Option<usize> {
    FEATURE_SCHEMA.iter().position(|column| *column == name)
}

/// Ratios derived from the raw values. Denominators carry a +1 offset so they never hit zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedRatios {
    pub debt_to_income: f64,
    pub expense_to_income: f64,
    pub affordability_ratio: f64,
    pub emp_stability: f64,
}

impl DerivedRatios {
    pub fn from_application(application: &RawApplication) -> Self {
        let salary = f64::from(application.monthly_salary) + 1.0;
        Self {
            debt_to_income: f64::from(application.current_emi_amount) / salary,
            expense_to_income: f64::from(application.total_expenses) / salary,
            affordability_ratio: f64::from(application.bank_balance)
                / (f64::from(application.requested_amount) + 1.0),
            emp_stability: application.years_of_employment / (f64::from(application.age) + 1.0),
        }
    }
}

/// A named column of the encoded vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureColumn {
    pub name: &'static str,
    pub value: f64,
}

/// Model input laid out exactly as `FEATURE_SCHEMA`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Reindex arbitrary named columns onto the schema. Columns the schema does not know are
    /// dropped and schema columns that were not supplied stay at 0.
    pub fn from_columns<I, K>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut values = [0.0; FEATURE_COUNT];
        let mut supplied = [false; FEATURE_COUNT];

        for (name, value) in columns {
            let name = name.as_ref();
            match schema_index(name) {
                Some(index) => {
                    values[index] = value;
                    supplied[index] = true;
                }
                None => debug!(column = name, "dropping column outside the feature schema"),
            }
        }

        for (column, present) in FEATURE_SCHEMA.iter().zip(supplied) {
            if !present {
                debug!(column = *column, "feature column missing, filled with 0");
            }
        }

        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        schema_index(name).map(|index| self.values[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_SCHEMA.iter().copied().zip(self.values.iter().copied())
    }

    pub fn columns(&self) -> Vec<FeatureColumn> {
        self.iter()
            .map(|(name, value)| FeatureColumn { name, value })
            .collect()
    }

    fn first_non_finite(&self) -> Option<&'static str> {
        self.iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(name, _)| name)
    }
}

/// Stateless encoder from a validated raw application to the model input vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn encode(&self, application: &RawApplication) -> Result<FeatureVector, InputError> {
        application.validate()?;

        let ratios = DerivedRatios::from_application(application);
        let vector = FeatureVector::from_columns(raw_columns(application, &ratios));

        if let Some(field) = vector.first_non_finite() {
            return Err(InputError::NonFinite { field });
        }

        Ok(vector)
    }
}

fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

// Employment, house and scenario drop a baseline category; company type keeps all four.
fn raw_columns(application: &RawApplication, ratios: &DerivedRatios) -> Vec<(&'static str, f64)> {
    let employment = application.employment_type;
    let company = application.company_type;
    let house = application.house_type;
    let scenario = application.emi_scenario;

    vec![
        ("age", f64::from(application.age)),
        ("gender", indicator(application.gender == Gender::Male)),
        (
            "marital_status",
            indicator(application.marital_status == MaritalStatus::Married),
        ),
        ("education", f64::from(application.education.ordinal())),
        ("monthly_salary", f64::from(application.monthly_salary)),
        ("years_of_employment", application.years_of_employment),
        ("monthly_rent", f64::from(application.monthly_rent)),
        ("family_size", f64::from(application.family_size)),
        ("dependents", f64::from(application.dependents)),
        ("existing_loans", indicator(application.existing_loans)),
        ("current_emi_amount", f64::from(application.current_emi_amount)),
        ("credit_score", f64::from(application.credit_score)),
        ("bank_balance", f64::from(application.bank_balance)),
        ("emergency_fund", f64::from(application.emergency_fund)),
        ("requested_amount", f64::from(application.requested_amount)),
        ("requested_tenure", f64::from(application.requested_tenure)),
        ("debt_to_income", ratios.debt_to_income),
        ("total_expenses", f64::from(application.total_expenses)),
        ("expense_to_income", ratios.expense_to_income),
        ("affordability_ratio", ratios.affordability_ratio),
        ("emp_stability", ratios.emp_stability),
        (
            "employment_type_Private",
            indicator(employment == EmploymentType::Private),
        ),
        (
            "employment_type_Self-Employed",
            indicator(employment == EmploymentType::SelfEmployed),
        ),
        ("company_type_Mid-Size", indicator(company == CompanyType::MidSize)),
        ("company_type_Mnc", indicator(company == CompanyType::Mnc)),
        ("company_type_Small", indicator(company == CompanyType::Small)),
        ("company_type_Startup", indicator(company == CompanyType::Startup)),
        ("house_type_Own", indicator(house == HouseType::Own)),
        ("house_type_Rented", indicator(house == HouseType::Rented)),
        (
            "emi_scenario_Education Emi",
            indicator(scenario == EmiScenario::Education),
        ),
        (
            "emi_scenario_Home Appliances Emi",
            indicator(scenario == EmiScenario::HomeAppliances),
        ),
        (
            "emi_scenario_Personal Loan Emi",
            indicator(scenario == EmiScenario::PersonalLoan),
        ),
        (
            "emi_scenario_Vehicle Emi",
            indicator(scenario == EmiScenario::Vehicle),
        ),
    ]
}
