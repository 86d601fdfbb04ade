//! clusterpulse - live Kubernetes node and pod view over HTTP.

use clap::Parser;
use pulse_server::{Cli, app, logging};
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format)?;

    if let Err(e) = app::run(cli).await {
        error!(error = %e, "clusterpulse failed");
        return Err(e.into());
    }
    Ok(())
}
