use clinic_records::app;
use clinic_records::config::Config;
use clinic_records::state::TriageState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("triajes service starting");

    let config = Config::from_env()?;
    config.log_startup();

    let state = TriageState::from_config(&config).await?;

    app::serve(app::triage_router(state), &config).await
}
