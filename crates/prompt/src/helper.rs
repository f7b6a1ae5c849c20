//! Spawns and supervises the isolated prompt helper process, and
//! translates its exit into an answer.

use std::os::unix::process::ExitStatusExt;
use std::path::Path;

use tb_domain::{Answer, AppInfo, Error, RequestParameters, Result};

use crate::session::DisplaySession;

/// Run the prompt helper for one request. The channel fd is closed on
/// the parent's side as soon as the helper has been spawned — the
/// helper has its own inherited copy by then.
pub async fn run(
    session: &dyn DisplaySession,
    helper_path: &Path,
    app_info: &AppInfo,
    params: &RequestParameters,
) -> Result<Answer> {
    let fd = session.channel_fd();
    let mut command = tokio::process::Command::new(helper_path);
    command
        .arg(format!("--mir_server_socket=fd://{fd}"))
        .arg(format!("--title={}", app_info.localized_name))
        .arg(format!("--description={}", params.description))
        .env("MIR_SOCKET", format!("fd://{fd}"));

    let mut child = command
        .spawn()
        .map_err(|e| Error::Other(format!("spawning prompt helper: {e}")))?;

    session.close_channel_fd();

    tokio::select! {
        status = child.wait() => translate_exit(status),
        _ = session.stopped() => {
            if let Some(pid) = child.id() {
                unsafe {
                    libc::kill(pid as libc::pid_t, libc::SIGKILL);
                }
            }
            let _ = child.wait().await;
            Err(Error::InconclusiveAnswer)
        }
    }
}

fn translate_exit(status: std::io::Result<std::process::ExitStatus>) -> Result<Answer> {
    match status {
        Ok(status) => {
            if status.signal().is_some() {
                Err(Error::InconclusiveAnswer)
            } else if status.success() {
                Ok(Answer::Granted)
            } else {
                Ok(Answer::Denied)
            }
        }
        Err(e) => Err(Error::Other(format!("waiting for prompt helper: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TerminalDisplaySession;
    use std::sync::Arc;
    use tb_domain::{ApplicationId, Feature, Pid, Uid};

    fn params() -> RequestParameters {
        RequestParameters {
            uid: Uid::new(1000),
            pid: Pid::new(1),
            application_id: ApplicationId::from("app"),
            feature: Feature::new(0),
            description: "wants to use the camera".into(),
        }
    }

    fn app_info() -> AppInfo {
        AppInfo {
            icon_path: "/tmp/icon.png".into(),
            localized_name: "App".into(),
            application_id: ApplicationId::from("app"),
        }
    }

    async fn open_session() -> Arc<dyn DisplaySession> {
        use crate::session::{DisplaySessionProvider, TerminalDisplaySessionProvider};
        TerminalDisplaySessionProvider
            .open_session(Pid::new(1))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn helper_exit_success_grants() {
        let session = open_session().await;
        let answer = run(session.as_ref(), Path::new("/bin/true"), &app_info(), &params())
            .await
            .unwrap();
        assert_eq!(answer, Answer::Granted);
    }

    #[tokio::test]
    async fn helper_exit_failure_denies() {
        let session = open_session().await;
        let answer = run(session.as_ref(), Path::new("/bin/false"), &app_info(), &params())
            .await
            .unwrap();
        assert_eq!(answer, Answer::Denied);
    }

    #[tokio::test]
    async fn session_stop_kills_helper_and_reports_inconclusive() {
        // A helper stand-in that ignores its argv and sleeps, so the
        // stop notification has time to arrive before natural exit.
        let dir = tempfile::tempdir().unwrap();
        let script_path = dir.path().join("slow-helper.sh");
        std::fs::write(&script_path, "#!/bin/sh\nsleep 5\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&script_path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&script_path, perms).unwrap();
        }

        let session = Arc::new(TerminalDisplaySession::new().unwrap());
        let session_dyn: Arc<dyn DisplaySession> = session.clone();

        let run_fut = run(session_dyn.as_ref(), &script_path, &app_info(), &params());

        let notify = async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            session.notify_stopped();
        };

        let (result, _) = tokio::join!(run_fut, notify);
        assert!(matches!(result, Err(Error::InconclusiveAnswer)));
    }
}
