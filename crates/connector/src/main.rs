mod cli;

use clap::Parser;
use tb_domain::{Answer, Feature, Pid, Uid};
use tb_remote::RemoteConnector;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = cli::Cli::parse();
    let socket_path = cli::socket_path(&cli);

    let connector = RemoteConnector::connect(&socket_path)
        .await
        .map_err(|e| anyhow::anyhow!("connecting to broker at {}: {e}", socket_path.display()))?;

    let shutdown = tokio_util::sync::CancellationToken::new();
    let answer = connector
        .authenticate(
            Uid::new(cli.uid),
            Pid::new(cli.pid),
            Feature::new(cli.feature),
            &shutdown,
        )
        .await;

    match answer {
        Ok(Answer::Granted) => {
            println!("granted");
            Ok(())
        }
        Ok(Answer::Denied) => {
            println!("denied");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "request failed");
            println!("denied");
            std::process::exit(1);
        }
    }
}
