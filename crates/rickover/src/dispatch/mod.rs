pub mod backoff;
pub mod pool;
pub mod worker;

pub use pool::{Pool, PoolManager};
pub use worker::Worker;
