//! Guards against a confined caller impersonating a different uid.

use std::sync::Arc;

use async_trait::async_trait;
use tb_domain::{Answer, Error, RequestParameters, Result, Uid};

use crate::Agent;

/// Queries `uid_provider` on every call (not at construction), so tests
/// can vary the "current" uid. Fails with `PrivilegeEscalation` and
/// never calls the inner agent when `params.uid` disagrees.
pub struct PrivilegeEscalationGuard {
    uid_provider: Box<dyn Fn() -> Uid + Send + Sync>,
    inner: Arc<dyn Agent>,
}

impl PrivilegeEscalationGuard {
    pub fn new(uid_provider: impl Fn() -> Uid + Send + Sync + 'static, inner: Arc<dyn Agent>) -> Self {
        Self {
            uid_provider: Box::new(uid_provider),
            inner,
        }
    }

    /// Production provider: the effective uid of this process.
    pub fn current_process(inner: Arc<dyn Agent>) -> Self {
        Self::new(|| Uid::new(unsafe { libc::geteuid() }), inner)
    }
}

#[async_trait]
impl Agent for PrivilegeEscalationGuard {
    async fn authenticate(&self, params: &RequestParameters) -> Result<Answer> {
        let current = (self.uid_provider)();
        if params.uid != current {
            return Err(Error::PrivilegeEscalation);
        }
        self.inner.authenticate(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockAgent;
    use tb_domain::{Feature, Pid};

    fn params(uid: u32) -> RequestParameters {
        RequestParameters {
            uid: Uid::new(uid),
            pid: Pid::new(42),
            application_id: "app".into(),
            feature: Feature::new(0),
            description: "test".into(),
        }
    }

    #[tokio::test]
    async fn matching_uid_delegates() {
        let inner = MockAgent::granting();
        let guard = PrivilegeEscalationGuard::new(|| Uid::new(1000), inner.clone());
        let answer = guard.authenticate(&params(1000)).await.unwrap();
        assert_eq!(answer, Answer::Granted);
        assert_eq!(inner.call_count(), 1);
    }

    #[tokio::test]
    async fn mismatched_uid_fails_without_calling_inner() {
        let inner = MockAgent::granting();
        let guard = PrivilegeEscalationGuard::new(|| Uid::new(1000), inner.clone());
        let result = guard.authenticate(&params(1001)).await;
        assert!(matches!(result, Err(Error::PrivilegeEscalation)));
        assert_eq!(inner.call_count(), 0);
    }
}
