mod cli;
mod infra;
mod report;
mod routes;
mod server;

use newborn_care::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
