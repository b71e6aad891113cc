mod cli;
mod derive;
mod infra;
mod routes;
mod server;

use adoption_params::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
