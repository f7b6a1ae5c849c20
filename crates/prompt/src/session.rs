//! Display-session abstraction standing in for the host compositor's
//! session protocol (out of scope per the system's purpose — no Rust
//! client library for that protocol exists). `TerminalDisplaySession`
//! is a portable, testable stand-in built on `UnixDatagram` pairs;
//! `NullMirDisplaySessionProvider` always fails, exercising the
//! parent-pid fallback path the way a real compositor rejection would.

use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixDatagram;

use async_trait::async_trait;
use parking_lot::Mutex;
use tb_domain::{Error, Pid, Result};
use tokio::sync::Notify;

/// A live binding between the prompt helper and the requesting
/// application's display surface.
#[async_trait]
pub trait DisplaySession: Send + Sync {
    /// The pre-authenticated channel fd, close-on-exec already cleared,
    /// to be inherited by the prompt helper.
    fn channel_fd(&self) -> RawFd;

    /// Close the parent's copy of the channel fd. Called once the
    /// helper has been spawned and has inherited its own copy.
    fn close_channel_fd(&self);

    /// Resolves when the host reports this session stopped. Racing
    /// this against the helper's exit future gives idempotent
    /// behaviour for free: once the helper is reaped, nothing polls
    /// this again, so a late or repeated stop delivery is a no-op.
    async fn stopped(&self);

    /// Release the session with the host display protocol.
    async fn release(&self);
}

#[async_trait]
pub trait DisplaySessionProvider: Send + Sync {
    /// Open a session bound to `app_pid`'s display surface. Fails with
    /// a message containing "could not identify application session"
    /// when the host can't resolve the pid to a session — the prompt
    /// agent retries once with the parent pid on that specific failure.
    async fn open_session(&self, app_pid: Pid) -> Result<std::sync::Arc<dyn DisplaySession>>;
}

pub struct TerminalDisplaySession {
    child_end: Mutex<Option<UnixDatagram>>,
    stop: Notify,
}

impl TerminalDisplaySession {
    pub(crate) fn new() -> Result<Self> {
        let (parent_end, child_end) = UnixDatagram::pair().map_err(Error::Io)?;
        // UnixDatagram::pair sets CLOEXEC by default; clear it on the
        // end handed to the helper so it survives exec.
        clear_cloexec(child_end.as_raw_fd())?;
        // Nothing ever reads or writes the parent end; drop it right
        // away instead of holding it open for the session's lifetime.
        drop(parent_end);
        Ok(Self {
            child_end: Mutex::new(Some(child_end)),
            stop: Notify::new(),
        })
    }

    /// Deliver an asynchronous session-stopped notification, as the
    /// host display protocol would. Safe to call more than once or
    /// after the session is already released.
    pub fn notify_stopped(&self) {
        self.stop.notify_one();
    }
}

fn clear_cloexec(fd: RawFd) -> Result<()> {
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFD);
        if flags < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
        if libc::fcntl(fd, libc::F_SETFD, flags & !libc::FD_CLOEXEC) < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
    }
    Ok(())
}

#[async_trait]
impl DisplaySession for TerminalDisplaySession {
    fn channel_fd(&self) -> RawFd {
        self.child_end
            .lock()
            .as_ref()
            .map(|s| s.as_raw_fd())
            .unwrap_or(-1)
    }

    fn close_channel_fd(&self) {
        self.child_end.lock().take();
    }

    async fn stopped(&self) {
        self.stop.notified().await;
    }

    async fn release(&self) {
        self.close_channel_fd();
    }
}

/// Default, portable provider: every session is backed by a
/// `UnixDatagram` pair rather than a real compositor client connection.
pub struct TerminalDisplaySessionProvider;

#[async_trait]
impl DisplaySessionProvider for TerminalDisplaySessionProvider {
    async fn open_session(&self, _app_pid: Pid) -> Result<std::sync::Arc<dyn DisplaySession>> {
        Ok(std::sync::Arc::new(TerminalDisplaySession::new()?))
    }
}

/// Always fails to identify a session, the way a real Mir client would
/// report an unknown pid. Exists purely to exercise the parent-pid
/// fallback and the "session open fails twice" inconclusive path.
pub struct NullMirDisplaySessionProvider;

#[async_trait]
impl DisplaySessionProvider for NullMirDisplaySessionProvider {
    async fn open_session(&self, _app_pid: Pid) -> Result<std::sync::Arc<dyn DisplaySession>> {
        Err(Error::Other(
            "could not identify application session for pid".to_owned(),
        ))
    }
}
