//! The capability a dispatcher worker invokes with one acquired job. `dispatch`
//! returns only once the job has reached a terminal state (archived) or the
//! executor has surrendered responsibility for it (e.g. a timeout, itself
//! resolved into a terminal state through the callback reducer).

pub mod http;

use async_trait::async_trait;

use crate::model::QueuedJob;

#[async_trait]
pub trait Executor: Send + Sync {
    async fn dispatch(&self, job: QueuedJob) -> anyhow::Result<()>;
}

pub use http::{HttpExecutor, HttpExecutorConfig};
