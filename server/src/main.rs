use clap::Parser;
use server::config::Config;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    let rocket = server::build(&config).await?;

    info!("Listening on {}:{}", config.address, config.port);
    // Displaying a rocket error marks it handled; dropping it unseen panics.
    if let Err(e) = rocket.launch().await {
        error!("Server stopped: {}", e);
        anyhow::bail!("server failed");
    }
    Ok(())
}
