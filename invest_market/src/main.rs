use invest_market::cfg::Config;
use invest_market::server::Server;
use tokio::sync::oneshot;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    invest_market::logging::init(&config.log_filter);

    let svc = invest_market::bootstrap(&config).await?;
    let server = Server::new(svc, config.addr());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("ctrl-c received"),
            Err(e) => error!("failed to listen for ctrl-c: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    server.start(shutdown_rx).await
}
