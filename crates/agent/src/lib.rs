//! Agent interface and chain: a composable pipeline of decision
//! filters, each wrapping an inner agent and either returning a
//! terminal answer or delegating.

mod cached;
mod escalation;
mod formatter;
mod whitelist;

pub use cached::CachedAgent;
pub use escalation::PrivilegeEscalationGuard;
pub use formatter::AppIdFormatter;
pub use whitelist::Whitelist;

use async_trait::async_trait;
use tb_domain::{Answer, RequestParameters, Result};

/// Uniform decision contract. Implementations fail with
/// `Error::InconclusiveAnswer` when no decision can be derived, rather
/// than guessing.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn authenticate(&self, params: &RequestParameters) -> Result<Answer>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tb_domain::Error;

    /// Mock inner agent recording call count and returning a fixed
    /// answer, or failing with `InconclusiveAnswer` when `answer` is
    /// `None` — used to test filters in isolation.
    pub struct MockAgent {
        pub calls: AtomicUsize,
        pub answer: Option<Answer>,
    }

    impl MockAgent {
        pub fn granting() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                answer: Some(Answer::Granted),
            })
        }

        pub fn denying() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                answer: Some(Answer::Denied),
            })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                answer: None,
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Agent for MockAgent {
        async fn authenticate(&self, _params: &RequestParameters) -> Result<Answer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.ok_or(Error::InconclusiveAnswer)
        }
    }
}
