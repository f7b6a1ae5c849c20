mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tb_agent::{Agent, AppIdFormatter, CachedAgent, PrivilegeEscalationGuard, Whitelist};
use tb_domain::config::{Config, ConfigSeverity};
use tb_prompt::{PromptAgent, TerminalDisplaySessionProvider};
use tb_remote::confinement::AppArmorConfinementResolver;
use tb_remote::RemoteListener;
use tb_runtime::Runtime;
use tb_store::Store;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("TRUST_BROKER_LOG_FORMAT").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = cli::Cli::parse();
    let config = cli::load_config(&cli).context("loading configuration")?;

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!("configuration invalid, refusing to start");
    }

    let runtime = Runtime::new(config.server.worker_threads).context("building tokio runtime")?;
    let shutdown = runtime.shutdown_token();

    let socket_path = socket_path_for(&config);
    let store_socket_path = derive_store_socket(&socket_path);

    runtime.block_on(run(cli, config, socket_path, store_socket_path, shutdown))
}

async fn run(
    cli: cli::Cli,
    config: Config,
    socket_path: PathBuf,
    store_socket_path: PathBuf,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!(service = %config.server.for_service, "trust broker starting");

    let store = Arc::new(
        Store::open_for_service(
            &config.server.for_service,
            config.store.path_override.as_ref().map(Path::new),
        )
        .context("opening persistent store")?,
    );

    let helper_path = std::env::var("TRUST_PROMPT_HELPER")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("trust-prompt-helper"));

    let prompt_agent: Arc<dyn Agent> = match cli.local_agent {
        cli::LocalAgentKind::TerminalAgent => {
            Arc::new(PromptAgent::new(Arc::new(TerminalDisplaySessionProvider), helper_path))
        }
        cli::LocalAgentKind::MirAgent => {
            // No Mir client exists in this ecosystem; the terminal
            // provider is the only one wired up today, matching the
            // `DisplaySessionProvider` abstraction's default impl.
            Arc::new(PromptAgent::new(Arc::new(TerminalDisplaySessionProvider), helper_path))
        }
    };

    let cached: Arc<dyn Agent> = Arc::new(CachedAgent::new(store.clone(), prompt_agent));
    let escalation_guard: Arc<dyn Agent> =
        Arc::new(PrivilegeEscalationGuard::current_process(cached));
    let whitelist: Arc<dyn Agent> = Arc::new(Whitelist::unconfined(escalation_guard));
    let chain: Arc<dyn Agent> = Arc::new(AppIdFormatter::new(whitelist));

    let resolver = Arc::new(AppArmorConfinementResolver);
    let listener = RemoteListener::new(chain, resolver, cli.description_pattern.clone());

    let store_for_expose = store.clone();
    let expose_shutdown = shutdown.clone();
    let expose_path = store_socket_path.clone();
    tb_runtime::spawn_supervised("store-exposure", async move {
        tokio::select! {
            _ = expose_shutdown.cancelled() => {}
            result = tb_store::expose::serve(&expose_path, store_for_expose) => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "store-exposure endpoint stopped");
                }
            }
        }
    });

    listener
        .serve(&socket_path, shutdown)
        .await
        .context("remote listener stopped unexpectedly")?;

    tracing::info!("trust broker shut down cleanly");
    Ok(())
}

fn socket_path_for(config: &Config) -> PathBuf {
    if let Some(path) = &config.server.socket_path {
        return PathBuf::from(path);
    }
    runtime_dir().join(format!("{}.sock", config.server.for_service))
}

fn derive_store_socket(socket_path: &Path) -> PathBuf {
    let mut name = socket_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trust-broker".to_owned());
    name.push_str(".store.sock");
    socket_path
        .parent()
        .map(|dir| dir.join(&name))
        .unwrap_or_else(|| PathBuf::from(name))
}

fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir())
}
