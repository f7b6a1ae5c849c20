//! Process-wide runtime: a fixed worker pool driving the event loop
//! everything else is posted to, termination-signal handling, and
//! graceful shutdown.
//!
//! The runtime is constructed once in `main` and its
//! [`CancellationToken`] is passed explicitly into every component
//! that needs to know about shutdown (listener accept loops, the
//! connector's read loop, spawned background tasks) — no global
//! state.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

/// Owns the tokio runtime and the top-level shutdown token. Dropping
/// this after `shutdown()` has completed tears the runtime down
/// deterministically.
pub struct Runtime {
    handle: tokio::runtime::Runtime,
    shutdown: CancellationToken,
}

impl Runtime {
    /// Build a multi-threaded runtime with `worker_threads` workers
    /// (clamped to at least 1).
    pub fn new(worker_threads: usize) -> std::io::Result<Self> {
        let handle = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .enable_all()
            .build()?;
        Ok(Self {
            handle,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run `main` to completion, trapping termination signals and
    /// cancelling the shutdown token when one arrives. `main` is
    /// responsible for reacting to the token and returning.
    pub fn block_on<F, T>(&self, main: F) -> T
    where
        F: Future<Output = T>,
    {
        self.handle.block_on(async move {
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                wait_for_termination_signal().await;
                tracing::info!("termination signal received, shutting down");
                shutdown.cancel();
            });
            main.await
        })
    }
}

#[cfg(unix)]
async fn wait_for_termination_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Spawn `task` so that a panic inside it is caught, logged, and never
/// propagates out to take down a worker thread.
pub fn spawn_supervised<F>(name: &'static str, task: F) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let result = AssertUnwindSafe(task).catch_unwind().await;
        if let Err(panic) = result {
            let message = panic_message(&panic);
            tracing::error!(task = name, panic = %message, "task panicked, continuing");
        }
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_builds_with_clamped_worker_count() {
        let runtime = Runtime::new(0).unwrap();
        let token = runtime.shutdown_token();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn block_on_runs_and_returns_value() {
        let runtime = Runtime::new(2).unwrap();
        let value = runtime.block_on(async { 1 + 1 });
        assert_eq!(value, 2);
    }

    #[test]
    fn spawn_supervised_survives_a_panic() {
        let runtime = Runtime::new(2).unwrap();
        runtime.block_on(async {
            let handle = spawn_supervised("test-task", async {
                panic!("boom");
            });
            let result = handle.await;
            assert!(result.is_ok(), "the supervisor task itself must not panic");
        });
    }
}
