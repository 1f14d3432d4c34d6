pub mod inbox;
pub mod loops;
pub mod metrics;

pub use inbox::{poll_inbox, InboxReport};
pub use loops::{spawn_identity_heartbeat, spawn_inbox_loop, spawn_scheduler_loop, spawn_status_reporter, LoopIntervals, ServiceHandles};
pub use metrics::{Metrics, MetricsSnapshot};
