//! Remote listener: broker-side socket accept loop, peer credential
//! verification, session routing, and agent chain dispatch.

use std::path::Path;
use std::sync::Arc;

use tb_agent::Agent;
use tb_domain::RequestParameters;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

use crate::confinement::ConfinementResolver;
use crate::registry::{SessionHandle, SessionRegistry};
use crate::wire::{AnswerRecord, RequestRecord};
use crate::{is_peer_gone, start_time};

pub struct RemoteListener {
    chain: Arc<dyn Agent>,
    resolver: Arc<dyn ConfinementResolver>,
    description_pattern: String,
    registry: Arc<SessionRegistry>,
}

impl RemoteListener {
    pub fn new(
        chain: Arc<dyn Agent>,
        resolver: Arc<dyn ConfinementResolver>,
        description_pattern: String,
    ) -> Self {
        Self {
            chain,
            resolver,
            description_pattern,
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    /// Serve on `socket_path` until `shutdown` is cancelled.
    pub async fn serve(&self, socket_path: &Path, shutdown: CancellationToken) -> std::io::Result<()> {
        let _ = std::fs::remove_file(socket_path);
        let listener = UnixListener::bind(socket_path)?;
        tracing::info!(path = %socket_path.display(), "remote listener accepting connections");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("remote listener shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let chain = self.chain.clone();
                            let resolver = self.resolver.clone();
                            let pattern = self.description_pattern.clone();
                            let registry = self.registry.clone();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                handle_connection(stream, chain, resolver, pattern, registry, shutdown).await;
                            });
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed, retrying");
                        }
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    chain: Arc<dyn Agent>,
    resolver: Arc<dyn ConfinementResolver>,
    description_pattern: String,
    registry: Arc<SessionRegistry>,
    shutdown: CancellationToken,
) {
    let creds = match crate::peercred::query(&stream) {
        Ok(creds) => creds,
        Err(e) => {
            tracing::warn!(error = %e, "failed to query peer credentials, dropping connection");
            return;
        }
    };

    registry.insert(
        creds.uid,
        SessionHandle {
            pid: creds.pid,
            gid: creds.gid,
        },
    );

    loop {
        let record = tokio::select! {
            _ = shutdown.cancelled() => break,
            record = RequestRecord::read_from(&mut stream) => record,
        };

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                if is_peer_gone(&e) {
                    registry.remove(creds.uid);
                }
                break;
            }
        };

        if registry.get(record.app_uid).is_none() {
            let _ = AnswerRecord(0).write_to(&mut stream).await;
            continue;
        }

        let start_before = start_time::read(record.app_pid).unwrap_or(record.app_start_time);

        let answer = decide(record, &chain, resolver.as_ref(), &description_pattern).await;

        let start_after = start_time::read(record.app_pid).unwrap_or(start_before);
        if start_after != start_before {
            tracing::warn!(pid = record.app_pid.get(), "process start time changed mid-request");
            let _ = AnswerRecord(0).write_to(&mut stream).await;
            continue;
        }

        let answer_record = match answer {
            Ok(answer) => AnswerRecord::from_answer(answer),
            Err(_) => AnswerRecord(0),
        };

        if AnswerRecord::write_to(answer_record, &mut stream).await.is_err() {
            registry.remove(creds.uid);
            break;
        }
    }
}

async fn decide(
    record: RequestRecord,
    chain: &Arc<dyn Agent>,
    resolver: &dyn ConfinementResolver,
    description_pattern: &str,
) -> tb_domain::Result<tb_domain::Answer> {
    let application_id = resolver.resolve(record.app_pid)?;
    let description = crate::description::build(description_pattern, application_id.as_str())?;

    let params = RequestParameters {
        uid: record.app_uid,
        pid: record.app_pid,
        application_id,
        feature: record.feature,
        description,
    };

    chain.authenticate(&params).await
}
