//! Broker CLI surface: required `--for-service`, `--local-agent`,
//! `--remote-agent`, plus a handful of recognized free-form keys
//! passed through to agent factories.

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "trust-brokerd", version, about = "Per-service trust broker daemon")]
pub struct Cli {
    /// Service name this broker instance guards; also the store's
    /// database file stem.
    #[arg(long = "for-service")]
    pub for_service: String,

    /// Which local (prompt) agent implementation to use.
    #[arg(long = "local-agent", value_enum)]
    pub local_agent: LocalAgentKind,

    /// Which remote listener implementation to use. Only one exists
    /// today; the flag is kept for parity with the skeleton role.
    #[arg(long = "remote-agent", default_value = "UnixDomainSocketRemoteAgent")]
    pub remote_agent: String,

    /// Path to the helper's pre-authenticated Mir server socket,
    /// consumed by the Mir-backed prompt session provider.
    #[arg(long = "trusted-mir-socket")]
    pub trusted_mir_socket: Option<String>,

    /// Filesystem path of the remote listener's local socket. Derived
    /// from `for_service` under the runtime directory when absent.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Format string for the prompt description, substituting `%1$s`
    /// with the resolved application id.
    #[arg(long = "description-pattern", default_value = "%1$s wants to use a restricted feature")]
    pub description_pattern: String,

    /// Optional TOML config file layered beneath these flags.
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LocalAgentKind {
    MirAgent,
    TerminalAgent,
}

/// Load the optional config file: `--config`, else `$TRUST_BROKER_CONFIG`,
/// else no file (CLI flags and defaults only).
pub fn load_config(cli: &Cli) -> anyhow::Result<tb_domain::config::Config> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var("TRUST_BROKER_CONFIG").ok());

    let mut config = match path {
        Some(path) if std::path::Path::new(&path).exists() => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
            toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))?
        }
        _ => tb_domain::config::Config::default(),
    };

    config.server.for_service = cli.for_service.clone();
    if config.server.socket_path.is_none() {
        config.server.socket_path = cli.endpoint.clone();
    }

    Ok(config)
}
