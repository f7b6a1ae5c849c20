//! Cache lookup over the persistent store, falling back to the inner
//! agent (the prompt agent, in the production chain) on a miss.

use std::sync::Arc;

use async_trait::async_trait;
use tb_domain::{Answer, Request, RequestParameters, Result, Timestamp};
use tb_store::Store;

use crate::Agent;

/// Cache miss is "no row matches both `application_id` and `feature`".
/// On a hit, the most recent matching row wins — the store enumerates
/// unconstrained and constrained queries alike in descending `when`
/// order, so the first result is always the freshest.
pub struct CachedAgent {
    store: Arc<Store>,
    inner: Arc<dyn Agent>,
}

impl CachedAgent {
    pub fn new(store: Arc<Store>, inner: Arc<dyn Agent>) -> Self {
        Self { store, inner }
    }
}

#[async_trait]
impl Agent for CachedAgent {
    async fn authenticate(&self, params: &RequestParameters) -> Result<Answer> {
        let mut query = self.store.query();
        query
            .for_application_id(params.application_id.as_str())
            .for_feature(params.feature);
        query.execute()?;

        if query.status() == tb_store::Status::HasMoreResults {
            let hit = query.current()?;
            tracing::debug!(app = %params.application_id, feature = %params.feature, "cache hit");
            return Ok(hit.answer);
        }

        tracing::debug!(app = %params.application_id, feature = %params.feature, "cache miss");
        let answer = self.inner.authenticate(params).await?;

        self.store.add(&Request {
            from: params.application_id.clone(),
            feature: params.feature,
            when: Timestamp::now(),
            answer,
        })?;

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockAgent;
    use tb_domain::{Feature, Pid, Uid};

    fn params() -> RequestParameters {
        RequestParameters {
            uid: Uid::new(1000),
            pid: Pid::new(42),
            application_id: "app".into(),
            feature: Feature::new(7),
            description: "test".into(),
        }
    }

    #[tokio::test]
    async fn hit_does_not_call_inner() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store
            .add(&Request {
                from: "app".into(),
                feature: Feature::new(7),
                when: Timestamp::from_nanos(10),
                answer: Answer::Granted,
            })
            .unwrap();

        let inner = MockAgent::denying();
        let agent = CachedAgent::new(store, inner.clone());
        let answer = agent.authenticate(&params()).await.unwrap();
        assert_eq!(answer, Answer::Granted);
        assert_eq!(inner.call_count(), 0);
    }

    #[tokio::test]
    async fn miss_calls_inner_and_writes_result() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let inner = MockAgent::granting();
        let agent = CachedAgent::new(store.clone(), inner.clone());

        let answer = agent.authenticate(&params()).await.unwrap();
        assert_eq!(answer, Answer::Granted);
        assert_eq!(inner.call_count(), 1);

        // second call is now a hit
        let answer2 = agent.authenticate(&params()).await.unwrap();
        assert_eq!(answer2, Answer::Granted);
        assert_eq!(inner.call_count(), 1);
    }

    #[tokio::test]
    async fn inner_failure_leaves_store_unchanged() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let inner = MockAgent::failing();
        let agent = CachedAgent::new(store.clone(), inner);
        let result = agent.authenticate(&params()).await;
        assert!(result.is_err());

        let mut q = store.query();
        q.all();
        q.execute().unwrap();
        assert_eq!(q.status(), tb_store::Status::Eor);
    }
}
