use crate::demo::{run_assess, run_batch, run_demo, AssessArgs, BatchArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use emi_predictor::config::ModelConfig;
use emi_predictor::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "EMI Predictor",
    about = "Assess EMI eligibility and affordable instalments from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Assess a single application read from a JSON file (form defaults if omitted)
    Assess(AssessArgs),
    /// Assess every row of a CSV export and print one line per row
    Batch(BatchArgs),
    /// Print the encoded feature vector and outcome for the default application
    Demo(ModelArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) models: ModelArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ModelArgs {
    /// Override the eligibility classifier artifact path
    #[arg(long)]
    pub(crate) classifier: Option<PathBuf>,
    /// Override the affordability regressor artifact path
    #[arg(long)]
    pub(crate) regressor: Option<PathBuf>,
}

impl ModelArgs {
    pub(crate) fn apply(self, config: &mut ModelConfig) {
        if let Some(path) = self.classifier {
            config.classifier_path = path;
        }
        if let Some(path) = self.regressor {
            config.regressor_path = path;
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Assess(args) => run_assess(args),
        Command::Batch(args) => run_batch(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["emi-predictor-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn model_overrides_replace_configured_paths() {
        let cli = Cli::try_parse_from([
            "emi-predictor-api",
            "serve",
            "--port",
            "8080",
            "--classifier",
            "/srv/models/classifier.json",
        ])
        .expect("parses");

        let Some(Command::Serve(args)) = cli.command else {
            panic!("expected serve command");
        };
        assert_eq!(args.port, Some(8080));

        let mut config = ModelConfig {
            classifier_path: PathBuf::from("models/best_classifier_model.json"),
            regressor_path: PathBuf::from("models/best_regression_model.json"),
        };
        args.models.apply(&mut config);
        assert_eq!(
            config.classifier_path,
            PathBuf::from("/srv/models/classifier.json")
        );
        assert_eq!(
            config.regressor_path,
            PathBuf::from("models/best_regression_model.json")
        );
    }

    #[test]
    fn batch_requires_a_csv_path() {
        assert!(Cli::try_parse_from(["emi-predictor-api", "batch"]).is_err());
        let cli = Cli::try_parse_from(["emi-predictor-api", "batch", "--csv", "applicants.csv"])
            .expect("parses");
        assert!(matches!(cli.command, Some(Command::Batch(_))));
    }
}
