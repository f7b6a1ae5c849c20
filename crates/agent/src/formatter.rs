//! Normalizes `<package>_<app>_<version>` application ids to `<package>`.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tb_domain::{Answer, RequestParameters, Result};

use crate::Agent;

/// Reduces a three-part application id to its package component before
/// delegating. Ids that don't match the pattern pass through unchanged.
pub struct AppIdFormatter {
    pattern: Regex,
    inner: Arc<dyn Agent>,
}

impl AppIdFormatter {
    /// Panics if `inner` construction is skipped — this filter is never
    /// meaningful without something to delegate to.
    pub fn new(inner: Arc<dyn Agent>) -> Self {
        Self {
            pattern: Regex::new(r"^(.*)_(.*)_(.*)$").expect("static regex is valid"),
            inner,
        }
    }

    fn normalize(&self, id: &str) -> String {
        match self.pattern.captures(id) {
            Some(caps) => caps[1].to_owned(),
            None => id.to_owned(),
        }
    }
}

#[async_trait]
impl Agent for AppIdFormatter {
    async fn authenticate(&self, params: &RequestParameters) -> Result<Answer> {
        let normalized = self.normalize(params.application_id.as_str());
        if normalized == params.application_id.as_str() {
            return self.inner.authenticate(params).await;
        }
        let mut forwarded = params.clone();
        forwarded.application_id = normalized.into();
        self.inner.authenticate(&forwarded).await
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
    async fn leaves_unmatched_id_unchanged() {
        let inner = MockAgent::granting();
        let formatter = AppIdFormatter::new(inner.clone());
        formatter.authenticate(&params("foo_bar")).await.unwrap();
        assert_eq!(inner.call_count(), 1);
    }

    #[tokio::test]
    async fn reduces_three_part_id_to_package() {
        let inner = MockAgent::granting();
        let formatter = AppIdFormatter::new(inner);
        let result = formatter.authenticate(&params("foo_bar_1.2.3")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn normalized_id_is_forwarded_to_inner() {
        struct Capturing {
            seen: std::sync::Mutex<Option<String>>,
        }
        #[async_trait]
        impl Agent for Capturing {
            async fn authenticate(&self, params: &RequestParameters) -> Result<Answer> {
                *self.seen.lock().unwrap() = Some(params.application_id.to_string());
                Ok(Answer::Granted)
            }
        }
        let capturing = Arc::new(Capturing {
            seen: std::sync::Mutex::new(None),
        });
        let formatter = AppIdFormatter::new(capturing.clone());
        formatter.authenticate(&params("foo_bar_1.2.3")).await.unwrap();
        assert_eq!(capturing.seen.lock().unwrap().as_deref(), Some("foo"));
    }
}
