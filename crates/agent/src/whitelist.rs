//! Unconditional-grant bypass for predicate-matching requests.

use std::sync::Arc;

use async_trait::async_trait;
use tb_domain::{Answer, RequestParameters, Result};

use crate::Agent;

/// If `predicate` holds, returns `granted` without ever consulting the
/// inner agent. The default production predicate matches
/// `application_id == "unconfined"`.
pub struct Whitelist {
    predicate: Box<dyn Fn(&RequestParameters) -> bool + Send + Sync>,
    inner: Arc<dyn Agent>,
}

impl Whitelist {
    pub fn new(
        predicate: impl Fn(&RequestParameters) -> bool + Send + Sync + 'static,
        inner: Arc<dyn Agent>,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            inner,
        }
    }

    /// The canonical production predicate: bypass for the `unconfined`
    /// application id.
    pub fn unconfined(inner: Arc<dyn Agent>) -> Self {
        Self::new(|params| params.application_id.as_str() == "unconfined", inner)
    }
}

#[async_trait]
impl Agent for Whitelist {
    async fn authenticate(&self, params: &RequestParameters) -> Result<Answer> {
        if (self.predicate)(params) {
            return Ok(Answer::Granted);
        }
        self.inner.authenticate(params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockAgent;
    use tb_domain::{Feature, Pid, Uid};

    fn params(app_id: &str) -> RequestParameters {
        RequestParameters {
            uid: Uid::new(1000),
            pid: Pid::new(42),
            application_id: app_id.into(),
            feature: Feature::new(0),
            description: "test".into(),
        }
    }

    #[tokio::test]
    async fn bypasses_inner_when_predicate_matches() {
        let inner = MockAgent::denying();
        let whitelist = Whitelist::unconfined(inner.clone());
        let answer = whitelist.authenticate(&params("unconfined")).await.unwrap();
        assert_eq!(answer, Answer::Granted);
        assert_eq!(inner.call_count(), 0);
    }

    #[tokio::test]
    async fn delegates_when_predicate_does_not_match() {
        let inner = MockAgent::denying();
        let whitelist = Whitelist::unconfined(inner.clone());
        let answer = whitelist.authenticate(&params("some.app")).await.unwrap();
        assert_eq!(answer, Answer::Denied);
        assert_eq!(inner.call_count(), 1);
    }

    #[tokio::test]
    async fn idempotent_regardless_of_inner_state() {
        let inner = MockAgent::failing();
        let whitelist = Whitelist::unconfined(inner);
        let answer = whitelist.authenticate(&params("unconfined")).await.unwrap();
        assert_eq!(answer, Answer::Granted);
    }
}
