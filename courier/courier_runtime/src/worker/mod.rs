//! Worker-side collaborators of the dispatch path: the published pool
//! status and the channels invocations travel through.

pub mod channel;
pub mod pool;

pub use channel::{InvocationChannel, QueuedInvocationChannel, WorkItem, WorkerInbox};
pub use pool::{ReadinessView, WorkerPoolStatus};
