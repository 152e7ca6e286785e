mod cli;
mod infra;
mod routes;
mod server;
mod simulate;

use solar_proposal::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
