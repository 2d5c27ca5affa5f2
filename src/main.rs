use breach_alerts::configuration::get_configuration;
use breach_alerts::startup::Application;
use breach_alerts::telemetry::get_subscriber;
use breach_alerts::telemetry::init_subscriber;

/// Initialise telemetry, load config, and start the server
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("breach-alerts", "info", std::io::stdout);
    init_subscriber(subscriber)?;

    let cfg = get_configuration()?;

    let server = Application::build(cfg).await?;
    server.run_until_stopped().await?;

    Ok(())
}
