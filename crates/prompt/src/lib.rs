//! Prompt agent: launches and supervises an isolated prompt helper
//! process bound to the requesting application's display session,
//! translating the helper's exit status into an answer.

mod appinfo;
mod helper;
mod session;

pub use appinfo::{resolve_app_info, AppInfoError};
pub use session::{DisplaySession, DisplaySessionProvider, TerminalDisplaySessionProvider};

#[cfg(test)]
pub use session::NullMirDisplaySessionProvider;

use std::sync::Arc;

use async_trait::async_trait;
use tb_agent::Agent;
use tb_domain::{Answer, Error, Pid, Result};

/// Command used to exec the isolated prompt helper. Overridable for
/// tests, which substitute a fast stand-in binary.
pub struct PromptAgent {
    sessions: Arc<dyn DisplaySessionProvider>,
    helper_path: std::path::PathBuf,
}

impl PromptAgent {
    pub fn new(sessions: Arc<dyn DisplaySessionProvider>, helper_path: std::path::PathBuf) -> Self {
        Self {
            sessions,
            helper_path,
        }
    }
}

#[async_trait]
impl Agent for PromptAgent {
    async fn authenticate(&self, params: &tb_domain::RequestParameters) -> Result<Answer> {
        let app_info = resolve_app_info(&params.application_id)
            .map_err(|e| Error::Other(format!("resolving app info: {e}")))?;

        let session = match self.sessions.open_session(params.pid).await {
            Ok(session) => session,
            Err(e) if is_unidentified_session(&e) => {
                tracing::debug!("session open failed, retrying with parent pid");
                let parent = parent_pid(params.pid)?;
                self.sessions
                    .open_session(parent)
                    .await
                    .map_err(|_| Error::InconclusiveAnswer)?
            }
            Err(_) => return Err(Error::InconclusiveAnswer),
        };

        let outcome = helper::run(
            session.as_ref(),
            &self.helper_path,
            &app_info,
            params,
        )
        .await;

        session.release().await;
        outcome
    }
}

fn is_unidentified_session(err: &Error) -> bool {
    err.to_string().contains("could not identify application session")
}

/// Looks up the parent pid of `pid` via `/proc`, used by the session
/// fallback path. Fails with `InconclusiveAnswer` when unavailable
/// (non-Linux, or the process already exited).
fn parent_pid(pid: Pid) -> Result<Pid> {
    let stat_path = format!("/proc/{}/stat", pid.get());
    let contents = std::fs::read_to_string(&stat_path).map_err(|_| Error::InconclusiveAnswer)?;
    // Fields after the parenthesized comm name are space-separated;
    // PPid is field 4 (1-indexed).
    let after_comm = contents.rsplit(')').next().ok_or(Error::InconclusiveAnswer)?;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    let ppid_str = fields.get(1).ok_or(Error::InconclusiveAnswer)?;
    let ppid: i32 = ppid_str.parse().map_err(|_| Error::InconclusiveAnswer)?;
    Ok(Pid::new(ppid))
}
