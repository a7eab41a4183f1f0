use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Rejection raised at the input boundary, before anything reaches a model artifact.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("{field} '{value}' is not one of: {allowed}")]
    UnknownCategory {
        field: &'static str,
        value: String,
        allowed: String,
    },
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("{field} {value} is outside the accepted range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

macro_rules! categorical {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal, { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const FIELD: &'static str = $field;

            /// Options in the order the input form presents them; the first is the default.
            pub fn ordered() -> &'static [Self] {
                &[$(Self::$variant),+]
            }

            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }

            pub fn parse(raw: &str) -> Result<Self, InputError> {
                let trimmed = raw.trim();
                Self::ordered()
                    .iter()
                    .copied()
                    .find(|option| option.label() == trimmed)
                    .ok_or_else(|| InputError::UnknownCategory {
                        field: $field,
                        value: raw.to_string(),
                        allowed: Self::labels().join(", "),
                    })
            }

            pub fn labels() -> Vec<&'static str> {
                Self::ordered().iter().map(|option| option.label()).collect()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::ordered()[0]
            }
        }

        impl TryFrom<String> for $name {
            type Error = InputError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.label()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

categorical!(Gender, "gender", {
    Male => "Male",
    Female => "Female",
});

categorical!(MaritalStatus, "marital_status", {
    Single => "Single",
    Married => "Married",
});

categorical!(
    /// Ordinal: the encoder emits the position in this list.
    Education, "education", {
        HighSchool => "High School",
        Graduate => "Graduate",
        PostGraduate => "Post Graduate",
        Professional => "Professional",
    }
);

categorical!(EmploymentType, "employment_type", {
    Private => "Private",
    SelfEmployed => "Self-Employed",
    Government => "Government",
});

categorical!(CompanyType, "company_type", {
    Mnc => "Mnc",
    MidSize => "Mid-Size",
    Small => "Small",
    Startup => "Startup",
});

categorical!(HouseType, "house_type", {
    Own => "Own",
    Rented => "Rented",
    Family => "Family",
});

categorical!(EmiScenario, "emi_scenario", {
    PersonalLoan => "Personal Loan Emi",
    ECommerceShopping => "E-Commerce Shopping Emi",
    Education => "Education Emi",
    Vehicle => "Vehicle Emi",
    HomeAppliances => "Home Appliances Emi",
});

impl Education {
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::HighSchool => 0,
            Self::Graduate => 1,
            Self::PostGraduate => 2,
            Self::Professional => 3,
        }
    }
}

/// Accepted range and form default for one numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldBounds {
    pub field: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

const fn bounds(field: &'static str, min: f64, max: f64, default: f64) -> FieldBounds {
    FieldBounds {
        field,
        min,
        max,
        default,
    }
}

pub const NUMERIC_BOUNDS: [FieldBounds; 13] = [
    bounds("age", 18.0, 70.0, 30.0),
    bounds("years_of_employment", 0.0, 40.0, 3.0),
    bounds("family_size", 1.0, 10.0, 4.0),
    bounds("dependents", 0.0, 8.0, 1.0),
    bounds("credit_score", 300.0, 900.0, 700.0),
    bounds("monthly_salary", 5_000.0, 200_000.0, 50_000.0),
    bounds("monthly_rent", 0.0, 100_000.0, 10_000.0),
    bounds("bank_balance", 0.0, 200_000.0, 25_000.0),
    bounds("emergency_fund", 0.0, 200_000.0, 15_000.0),
    bounds("current_emi_amount", 0.0, 100_000.0, 10_000.0),
    bounds("requested_amount", 5_000.0, 1_000_000.0, 200_000.0),
    bounds("requested_tenure", 6.0, 120.0, 24.0),
    bounds("total_expenses", 1_000.0, 100_000.0, 12_000.0),
];

/// One applicant's submission as entered on the form. Omitted fields take the form defaults;
/// unrecognised field names are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawApplication {
    pub age: u32,
    pub gender: Gender,
    pub marital_status: MaritalStatus,
    pub education: Education,
    pub employment_type: EmploymentType,
    pub company_type: CompanyType,
    pub house_type: HouseType,
    pub years_of_employment: f64,
    pub family_size: u32,
    pub dependents: u32,
    #[serde(
        serialize_with = "serialize_flag",
        deserialize_with = "deserialize_flag"
    )]
    pub existing_loans: bool,
    pub credit_score: u32,
    pub monthly_salary: u32,
    pub monthly_rent: u32,
    pub bank_balance: u32,
    pub emergency_fund: u32,
    pub current_emi_amount: u32,
    pub requested_amount: u32,
    pub requested_tenure: u32,
    pub total_expenses: u32,
    pub emi_scenario: EmiScenario,
}

impl Default for RawApplication {
    fn default() -> Self {
        Self {
            age: 30,
            gender: Gender::default(),
            marital_status: MaritalStatus::default(),
            education: Education::default(),
            employment_type: EmploymentType::default(),
            company_type: CompanyType::default(),
            house_type: HouseType::default(),
            years_of_employment: 3.0,
            family_size: 4,
            dependents: 1,
            existing_loans: false,
            credit_score: 700,
            monthly_salary: 50_000,
            monthly_rent: 10_000,
            bank_balance: 25_000,
            emergency_fund: 15_000,
            current_emi_amount: 10_000,
            requested_amount: 200_000,
            requested_tenure: 24,
            total_expenses: 12_000,
            emi_scenario: EmiScenario::default(),
        }
    }
}

impl RawApplication {
    /// Numeric fields paired with their value, in `NUMERIC_BOUNDS` order.
    pub fn numeric_fields(&self) -> [(&'static str, f64); 13] {
        [
            ("age", f64::from(self.age)),
            ("years_of_employment", self.years_of_employment),
            ("family_size", f64::from(self.family_size)),
            ("dependents", f64::from(self.dependents)),
            ("credit_score", f64::from(self.credit_score)),
            ("monthly_salary", f64::from(self.monthly_salary)),
            ("monthly_rent", f64::from(self.monthly_rent)),
            ("bank_balance", f64::from(self.bank_balance)),
            ("emergency_fund", f64::from(self.emergency_fund)),
            ("current_emi_amount", f64::from(self.current_emi_amount)),
            ("requested_amount", f64::from(self.requested_amount)),
            ("requested_tenure", f64::from(self.requested_tenure)),
            ("total_expenses", f64::from(self.total_expenses)),
        ]
    }

    pub fn validate(&self) -> Result<(), InputError> {
        for ((field, value), limits) in self.numeric_fields().into_iter().zip(NUMERIC_BOUNDS) {
            debug_assert_eq!(field, limits.field);
            if !value.is_finite() {
                return Err(InputError::NonFinite { field });
            }
            if value < limits.min || value > limits.max {
                return Err(InputError::OutOfRange {
                    field,
                    value,
                    min: limits.min,
                    max: limits.max,
                });
            }
        }
        Ok(())
    }
}

fn serialize_flag<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u8(u8::from(*value))
}

/// The form offers 0/1 for existing loans; JSON clients may also send booleans.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlagVisitor;

    impl<'de> Visitor<'de> for FlagVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("0, 1, true or false")
        }

        fn visit_bool<E: de::Error>(self, value: bool) -> Result<bool, E> {
            Ok(value)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<bool, E> {
            match value {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(E::invalid_value(de::Unexpected::Unsigned(other), &self)),
            }
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<bool, E> {
            match value {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(E::invalid_value(de::Unexpected::Signed(other), &self)),
            }
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<bool, E> {
            match value.trim().to_ascii_lowercase().as_str() {
                "0" | "false" => Ok(false),
                "1" | "true" => Ok(true),
                _ => Err(E::invalid_value(de::Unexpected::Str(value), &self)),
            }
        }
    }

    deserializer.deserialize_any(FlagVisitor)
}
