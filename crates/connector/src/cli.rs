//! Connector CLI surface: shares the broker's flag vocabulary minus
//! `--local-agent` — the connector never prompts, it only forwards to
//! the broker.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "trust-connector", version, about = "Forwards trust decisions to the broker")]
pub struct Cli {
    /// Service name; used to derive the broker socket path when
    /// `--endpoint` is absent.
    #[arg(long = "for-service")]
    pub for_service: String,

    /// Which remote agent implementation to use.
    #[arg(long = "remote-agent", default_value = "UnixDomainSocketRemoteAgent")]
    pub remote_agent: String,

    /// Filesystem path of the broker's local socket.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Requesting application's uid, for a one-shot probe request.
    #[arg(long)]
    pub uid: u32,

    /// Requesting application's pid, for a one-shot probe request.
    #[arg(long)]
    pub pid: i32,

    /// Feature identifier being requested.
    #[arg(long)]
    pub feature: u64,
}

pub fn socket_path(cli: &Cli) -> std::path::PathBuf {
    if let Some(path) = &cli.endpoint {
        return std::path::PathBuf::from(path);
    }
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir());
    runtime_dir.join(format!("{}.sock", cli.for_service))
}
