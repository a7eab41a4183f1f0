mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use emi_predictor::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
