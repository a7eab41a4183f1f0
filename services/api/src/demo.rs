use crate::cli::ModelArgs;
use crate::infra::{build_service, AssessmentService};
use clap::Args;
use emi_predictor::config::AppConfig;
use emi_predictor::eligibility::{AssessmentError, AssessmentView, BatchRow, RawApplication};
use emi_predictor::error::AppError;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// JSON file holding one application. Omitted fields take the form defaults.
    #[arg(long)]
    pub(crate) input: Option<PathBuf>,
    #[command(flatten)]
    pub(crate) models: ModelArgs,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV file whose header row names the application fields
    #[arg(long)]
    pub(crate) csv: PathBuf,
    #[command(flatten)]
    pub(crate) models: ModelArgs,
}

fn load_service(models: ModelArgs) -> Result<AssessmentService, AppError> {
    let mut config = AppConfig::load()?;
    models.apply(&mut config.models);
    build_service(&config.models)
}

fn read_application(input: Option<PathBuf>) -> Result<RawApplication, AppError> {
    let Some(path) = input else {
        return Ok(RawApplication::default());
    };
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader)
        .map_err(|err| AppError::from(AssessmentError::MalformedInput(err)))
}

pub(crate) fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let AssessArgs { input, models } = args;

    let service = load_service(models)?;
    let application = read_application(input)?;
    let assessment = service.assess(&application)?;

    render_assessment(&assessment.view());
    Ok(())
}

pub(crate) fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let BatchArgs { csv, models } = args;

    let service = load_service(models)?;
    let rows = service.assess_csv(BufReader::new(File::open(&csv)?))?;

    println!("Batch assessment for {}", csv.display());
    for row in &rows {
        println!("{}", batch_line(row));
    }

    let failed = rows.iter().filter(|row| row.error.is_some()).count();
    println!("{} rows assessed, {} rejected", rows.len() - failed, failed);
    Ok(())
}

pub(crate) fn run_demo(models: ModelArgs) -> Result<(), AppError> {
    let service = load_service(models)?;
    let application = RawApplication::default();

    println!("EMI eligibility demo (form defaults)");
    println!(
        "- Applicant: age {}, salary {}, credit score {}, requesting {} over {} months ({})",
        application.age,
        application.monthly_salary,
        application.credit_score,
        application.requested_amount,
        application.requested_tenure,
        application.emi_scenario
    );

    let features = service.encode(&application)?;
    println!("\nEncoded feature vector ({} columns)", features.as_slice().len());
    for (name, value) in features.iter() {
        println!("  {name:<34} {value:>14.6}");
    }

    let assessment = service.assess(&application)?;
    println!();
    render_assessment(&assessment.view());
    Ok(())
}

fn render_assessment(view: &AssessmentView) {
    println!("Decision: {}", view.decision);
    println!("{}", view.message);
    println!(
        "Ratios: debt-to-income {:.4}, expense-to-income {:.4}, affordability {:.4}, stability {:.4}",
        view.ratios.debt_to_income,
        view.ratios.expense_to_income,
        view.ratios.affordability_ratio,
        view.ratios.emp_stability
    );
    println!("Assessed at {}", view.assessed_at.to_rfc3339());
}

fn batch_line(row: &BatchRow) -> String {
    match (&row.assessment, &row.error) {
        (Some(view), _) => match &view.emi_amount_display {
            Some(amount) => format!("row {}: {} ({amount} per month)", row.row, view.decision),
            None => format!("row {}: {}", row.row, view.decision),
        },
        (None, Some(error)) => format!("row {}: error: {error}", row.row),
        (None, None) => format!("row {}: no result", row.row),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use emi_predictor::eligibility::DerivedRatios;
    use std::io::Write;

    fn view(decision: &'static str, amount: Option<&str>) -> AssessmentView {
        AssessmentView {
            decision,
            message: String::new(),
            emi_amount: None,
            emi_amount_display: amount.map(str::to_string),
            ratios: DerivedRatios::from_application(&RawApplication::default()),
            assessed_at: Utc::now(),
        }
    }

    #[test]
    fn batch_lines_show_amounts_and_errors() {
        let eligible = BatchRow {
            row: 1,
            assessment: Some(view("eligible", Some("₹7,850.00"))),
            error: None,
        };
        assert_eq!(batch_line(&eligible), "row 1: eligible (₹7,850.00 per month)");

        let risky = BatchRow {
            row: 2,
            assessment: Some(view("high_risk", None)),
            error: None,
        };
        assert_eq!(batch_line(&risky), "row 2: high_risk");

        let rejected = BatchRow {
            row: 3,
            assessment: None,
            error: Some("invalid input: age 17 is outside the accepted range".to_string()),
        };
        assert!(batch_line(&rejected).starts_with("row 3: error: invalid input"));
    }

    #[test]
    fn missing_input_uses_form_defaults() {
        let application = read_application(None).expect("defaults");
        assert_eq!(application, RawApplication::default());
    }

    #[test]
    fn input_file_overrides_selected_fields() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(br#"{"age": 41, "emi_scenario": "Education Emi", "existing_loans": 1}"#)
            .expect("write input");

        let application = read_application(Some(file.path().to_path_buf())).expect("parses");
        assert_eq!(application.age, 41);
        assert!(application.existing_loans);
        assert_eq!(application.monthly_salary, 50_000);
    }

    #[test]
    fn malformed_input_file_is_invalid_input() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"{ age: }").expect("write input");

        assert!(matches!(
            read_application(Some(file.path().to_path_buf())),
            Err(AppError::Assessment(AssessmentError::MalformedInput(_)))
        ));
    }

    #[test]
    fn unknown_category_in_input_file_is_invalid_input() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(br#"{"house_type": "Castle"}"#)
            .expect("write input");

        let err = read_application(Some(file.path().to_path_buf())).expect_err("rejected");
        assert!(matches!(
            err,
            AppError::Assessment(AssessmentError::MalformedInput(_))
        ));
        let message = err.to_string();
        assert!(message.contains("invalid input: house_type 'Castle'"), "{message}");
        assert!(!message.starts_with("io error"), "{message}");
    }

    #[test]
    fn missing_input_file_stays_an_io_error() {
        let missing = PathBuf::from("/nonexistent/emi/application.json");
        assert!(matches!(read_application(Some(missing)), Err(AppError::Io(_))));
    }
}
