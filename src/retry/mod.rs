//! Retry module (ergonomic namespace)
//! - task.rs: the `ApiTask` unit-of-work abstraction and closure adapter
//! - policy.rs: attempt budget, retry clauses and delays
//! - retry_task.rs: the retry decorator and its terminal errors

pub mod policy;
pub mod retry_task;
pub mod task;

pub use policy::*;
pub use retry_task::*;
pub use task::*;
