use anyhow::Result;
use holder_raffle::config::Config;
use holder_raffle::raffle::run_raffle;
use holder_raffle::rpc::RpcClient;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    info!("Starting token holder raffle");

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!(
        "Tracking {} token(s), {} excluded address(es)",
        config.tracked_tokens.len(),
        config.excluded_addresses.len()
    );
    info!(
        "RPC URLs: {} endpoint(s) configured",
        config.json_rpc_urls.len()
    );

    let client = RpcClient::new(&config.json_rpc_urls)?;

    match run_raffle(&client, &config).await {
        Ok((winner, weight)) => {
            info!("Raffle complete");
            println!("Winner: {winner} (aggregate balance {weight})");
            Ok(())
        }
        Err(e) => {
            error!("Raffle failed: {e:#}");
            Err(e)
        }
    }
}
