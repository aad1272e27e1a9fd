use std::env::set_var;
use std::sync::Arc;

use lambda_http::{run, Error};
use tracing::info;
use tracing_subscriber::EnvFilter;

use arbiter::app::{Repositories, Services};
use arbiter::config::ServiceConfig;
use arbiter::services::SystemTimeSource;
use arbiter_api::{app, AppState};

#[tokio::main]
async fn main() -> Result<(), Error> {
    set_var("AWS_LAMBDA_HTTP_IGNORE_STAGE_IN_PATH", "true");

    // JSON lines without ANSI colours so CloudWatch keeps them readable.
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_current_span(false)
        .with_ansi(false)
        .without_time()
        .init();

    let config = ServiceConfig::from_env()?;

    let aws_config = aws_config::load_from_env().await;
    let client = aws_sdk_dynamodb::Client::new(&aws_config);

    let repositories = Repositories::dynamodb(client, &config.tables);
    let services = Services::build(repositories, &config, Arc::new(SystemTimeSource));

    info!(tables = ?config.tables, "Match authority starting");
    run(app(AppState::from(services))).await
}
