//! Remote connector: service-side forwarder. Connects at construction
//! (fails fast otherwise), and for each decision needed by the host
//! service, verifies the requesting process hasn't been replaced
//! mid-request before trusting the broker's answer.

use std::path::Path;

use tb_domain::{Answer, Error, Feature, Pid, Result, Uid};
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;

use crate::wire::{AnswerRecord, RequestRecord};

pub struct RemoteConnector {
    stream: tokio::sync::Mutex<UnixStream>,
}

impl RemoteConnector {
    /// Connect to the broker's socket. Fails fast if the broker isn't
    /// listening.
    pub async fn connect(socket_path: &Path) -> std::io::Result<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        Ok(Self {
            stream: tokio::sync::Mutex::new(stream),
        })
    }

    /// Ask the broker to decide whether `app_uid`/`app_pid` may use
    /// `feature`. Verifies the process start time before sending and
    /// again after receiving the answer; a mismatch either way means
    /// the pid was recycled mid-request and the decision is untrustworthy.
    pub async fn authenticate(
        &self,
        app_uid: Uid,
        app_pid: Pid,
        feature: Feature,
        shutdown: &CancellationToken,
    ) -> Result<Answer> {
        self.authenticate_with(app_uid, app_pid, feature, shutdown, crate::start_time::read)
            .await
    }

    /// Same as [`Self::authenticate`], but with the process start-time
    /// lookup injected — lets tests simulate a pid getting recycled
    /// mid-request without actually racing `/proc`.
    pub async fn authenticate_with(
        &self,
        app_uid: Uid,
        app_pid: Pid,
        feature: Feature,
        shutdown: &CancellationToken,
        mut time_source: impl FnMut(Pid) -> std::io::Result<i64>,
    ) -> Result<Answer> {
        let start_before = time_source(app_pid).map_err(|e| Error::Other(e.to_string()))?;

        let record = RequestRecord {
            app_uid,
            app_pid,
            feature,
            app_start_time: start_before,
        };

        let mut stream = self.stream.lock().await;

        record
            .write_to(&mut *stream)
            .await
            .map_err(|_| Error::TransportLost)?;

        let answer_record = tokio::select! {
            _ = shutdown.cancelled() => return Err(Error::TransportLost),
            result = AnswerRecord::read_from(&mut *stream) => {
                result.map_err(|_| Error::TransportLost)?
            }
        };
        drop(stream);

        let start_after = time_source(app_pid).map_err(|e| Error::Other(e.to_string()))?;
        if start_after != start_before {
            return Err(Error::SpoofingDetected);
        }

        answer_record
            .to_answer()
            .ok_or_else(|| Error::Other("malformed answer record".to_owned()))
    }
}
