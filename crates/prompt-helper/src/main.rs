//! Isolated prompt helper process.
//!
//! Deliberately depends on nothing from the rest of the workspace:
//! its only inputs are argv and a single inherited file descriptor. A
//! missing or malformed required argument aborts the process rather
//! than exiting cleanly, so the parent never mistakes a startup
//! failure for a user decision.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "trust-prompt-helper", about = "Isolated trust prompt UI")]
struct Args {
    /// Pre-authenticated display channel, as `fd://<int>`.
    #[arg(long = "mir_server_socket")]
    mir_server_socket: String,

    /// Window/prompt title, usually the application's localized name.
    #[arg(long = "title")]
    title: String,

    /// Human-readable description of the requested feature.
    #[arg(long = "description", default_value = "")]
    description: String,

    /// Parse arguments, then exit 0 without prompting.
    #[arg(long = "testing")]
    testing: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(_) => {
            // Missing/invalid required argument: abort, not a clean exit,
            // so the parent can tell this apart from a user answer.
            std::process::abort();
        }
    };

    if !args.mir_server_socket.starts_with("fd://") {
        std::process::abort();
    }

    if args.testing {
        std::process::exit(0);
    }

    log_environment();

    let fd: i32 = args
        .mir_server_socket
        .trim_start_matches("fd://")
        .parse()
        .unwrap_or(-1);
    tracing::info!(fd, title = %args.title, "prompt helper started");

    let granted = prompt_user(&args.title, &args.description);
    std::process::exit(if granted { 0 } else { 1 });
}

fn log_environment() {
    for (key, value) in std::env::vars() {
        if key.starts_with("CORE_TRUST_MIR_PROMPT_") {
            tracing::debug!(%key, %value, "prompt helper environment variable");
        }
    }
}

/// Console fallback UI: no compositor client exists in this ecosystem
/// (the real implementation talks to the host display session over
/// the inherited fd). Reads a single y/n line from stdin; a closed or
/// non-interactive stdin denies, matching the default-deny policy.
fn prompt_user(title: &str, description: &str) -> bool {
    use std::io::Write;

    println!("{title}");
    if !description.is_empty() {
        println!("{description}");
    }
    print!("Allow? [y/N] ");
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(n) if n > 0 => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        _ => false,
    }
}
