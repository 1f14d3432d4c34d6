//! Application layer: orchestration across domain logic and infrastructure I/O.

pub mod context;
pub mod dispatcher;
pub mod handlers;
pub mod locks;
pub mod oracle;
pub mod scheduler;
pub mod signer;

pub use context::OracleContext;
pub use dispatcher::{classify, dispatch_request, dispatch_task, filter_tasks, DropReason, Request, RequestOutcome, TaskOutcome};
pub use locks::KeyedLocks;
pub use oracle::{Oracle, OracleSnapshot};
pub use scheduler::{Scheduler, TaskRun, TickReport};
