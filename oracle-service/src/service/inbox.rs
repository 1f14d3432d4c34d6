//! Inbox polling: every fetched message is dispatched once and trashed unless dispatch failed
//! transiently.

use crate::service::metrics::{drop_reason_label, Metrics};
use log::{debug, info, warn};
use oracle_core::application::{Oracle, RequestOutcome};
use oracle_core::foundation::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InboxReport {
    pub fetched: usize,
    pub accepted: usize,
    pub dropped: usize,
    /// Left in the inbox for the next poll.
    pub deferred: usize,
    pub trash_failures: usize,
}

pub async fn poll_inbox(oracle: &Oracle, metrics: &Metrics) -> Result<InboxReport> {
    let ctx = oracle.context();
    let messages = ctx.call("transport.fetch_inbox", ctx.transport.fetch_inbox()).await?;
    let mut report = InboxReport { fetched: messages.len(), ..InboxReport::default() };
    if messages.is_empty() {
        return Ok(report);
    }
    debug!("inbox fetched count={}", messages.len());

    for message in &messages {
        match oracle.handle_message(message).await {
            Ok(outcome) => {
                metrics.record_request_outcome(&outcome);
                match &outcome {
                    RequestOutcome::Accepted { tasks_created } => {
                        report.accepted += 1;
                        info!(
                            "request accepted message_id={} subject={} tasks_created={}",
                            message.message_id, message.subject, tasks_created
                        );
                    }
                    RequestOutcome::Dropped(reason) => {
                        report.dropped += 1;
                        debug!(
                            "request dropped message_id={} reason={} details={}",
                            message.message_id,
                            drop_reason_label(reason),
                            reason
                        );
                    }
                }
                if let Err(err) = ctx.call("transport.trash_message", ctx.transport.trash_message(&message.message_id)).await {
                    report.trash_failures += 1;
                    warn!("trash message failed message_id={} error={}", message.message_id, err);
                }
            }
            Err(err) => {
                metrics.record_request_deferred();
                report.deferred += 1;
                warn!("request deferred message_id={} error={}", message.message_id, err);
            }
        }
    }
    Ok(report)
}
