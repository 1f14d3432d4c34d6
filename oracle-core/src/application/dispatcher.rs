//! Inbound classification and routing of requests and due tasks to their handlers.

use crate::application::context::OracleContext;
use crate::application::handlers::handler_for;
use crate::domain::protocol::first_missing_field;
use crate::domain::{InboundMessage, Operation, Task};
use crate::foundation::{OracleError, Result, TaskId, MAX_MESSAGE_BODY_BYTES};
use crate::infrastructure::storage::Storage;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A message that passed classification: known operation, every required field present.
#[derive(Clone, Debug)]
pub struct Request {
    pub operation: Operation,
    pub body: Value,
    pub message: InboundMessage,
}

impl Request {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone())
            .map_err(|err| OracleError::MalformedRequest(format!("{} body: {}", self.operation, err)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    Malformed(String),
    UnknownOperation(String),
    MissingField(&'static str),
    /// The request parsed but its contents were rejected (amounts, condition, transaction).
    Invalid(String),
    /// A conditioned request carrying no more signatures than one already queued.
    Superseded,
    Duplicate,
    UnknownContract,
    NoValidGuess,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::Malformed(details) => write!(f, "malformed: {}", details),
            DropReason::UnknownOperation(name) => write!(f, "unknown operation '{}'", name),
            DropReason::MissingField(field) => write!(f, "missing field '{}'", field),
            DropReason::Invalid(details) => write!(f, "invalid: {}", details),
            DropReason::Superseded => f.write_str("superseded"),
            DropReason::Duplicate => f.write_str("duplicate"),
            DropReason::UnknownContract => f.write_str("unknown contract"),
            DropReason::NoValidGuess => f.write_str("no valid guess"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    Accepted { tasks_created: usize },
    Dropped(DropReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    /// Left as is; the next tick runs it again.
    Pending,
    /// Marked done and replaced by a later task.
    Rescheduled { next_task: TaskId },
    Parked,
}

/// Fail-closed parse of an inbound message.
pub fn classify(message: &InboundMessage) -> std::result::Result<Request, DropReason> {
    if message.body.len() > MAX_MESSAGE_BODY_BYTES {
        return Err(DropReason::Malformed(format!("body of {} bytes", message.body.len())));
    }
    let body: Value = serde_json::from_str(&message.body).map_err(|err| DropReason::Malformed(err.to_string()))?;
    let name = body
        .get("operation")
        .and_then(Value::as_str)
        .ok_or_else(|| DropReason::Malformed("no operation".to_string()))?;
    let operation = Operation::from_wire(name).ok_or_else(|| DropReason::UnknownOperation(name.to_string()))?;
    if let Some(field) = first_missing_field(operation, &body) {
        return Err(DropReason::MissingField(field));
    }
    Ok(Request { operation, body, message: message.clone() })
}

/// Routes a live message. Content errors become drops; only transient failures surface as
/// `Err`, so the caller keeps the message for another attempt.
pub async fn dispatch_request(ctx: &OracleContext, message: &InboundMessage) -> Result<RequestOutcome> {
    let request = match classify(message) {
        Ok(request) => request,
        Err(reason) => {
            debug!("message dropped msgid={} from={} reason={}", message.message_id, message.from_address, reason);
            return Ok(RequestOutcome::Dropped(reason));
        }
    };
    debug!("request classified msgid={} operation={}", message.message_id, request.operation);

    match handler_for(request.operation).handle_request(ctx, &request).await {
        Ok(outcome) => {
            match &outcome {
                RequestOutcome::Accepted { tasks_created } => {
                    info!("request accepted msgid={} operation={} tasks_created={}", message.message_id, request.operation, tasks_created)
                }
                RequestOutcome::Dropped(reason) => {
                    debug!("request dropped msgid={} operation={} reason={}", message.message_id, request.operation, reason)
                }
            }
            Ok(outcome)
        }
        Err(err) if err.is_transient() => {
            warn!("request deferred msgid={} operation={} error={}", message.message_id, request.operation, err);
            Err(err)
        }
        Err(err) => {
            info!("request rejected msgid={} operation={} error={}", message.message_id, request.operation, err);
            Ok(RequestOutcome::Dropped(DropReason::Invalid(err.to_string())))
        }
    }
}

pub async fn dispatch_task(ctx: &OracleContext, task: &Task) -> Result<TaskOutcome> {
    if task.done {
        return Ok(TaskOutcome::Completed);
    }
    debug!("task dispatched id={} operation={} filter={:?}", task.id, task.operation, task.filter_field);
    handler_for(task.operation).handle_task(ctx, task).await
}

/// Reduces each filter group to the survivor its handler selects. Ungrouped tasks pass through.
///
/// Survivors are chosen among every pending task of the group, so a survivor that is not yet due
/// holds the whole group back. Parked members never compete.
pub fn filter_tasks(storage: &dyn Storage, tasks: Vec<Task>) -> Result<Vec<Task>> {
    let mut selected = Vec::with_capacity(tasks.len());
    let mut groups: BTreeMap<String, Vec<TaskId>> = BTreeMap::new();
    for task in tasks {
        match task.filter_field.clone() {
            Some(group) => groups.entry(group).or_default().push(task.id),
            None => selected.push(task),
        }
    }
    for (group, due_ids) in groups {
        let members: Vec<Task> = storage.pending_tasks_in_group(&group)?.into_iter().filter(|task| !task.is_parked()).collect();
        let Some(first) = members.first() else {
            continue;
        };
        let Some(survivor) = handler_for(first.operation).select_survivor(&members) else {
            continue;
        };
        if due_ids.contains(&survivor) {
            if let Some(task) = members.into_iter().find(|task| task.id == survivor) {
                selected.push(task);
            }
        }
    }
    selected.sort_by_key(|task| (task.next_check, task.id));
    Ok(selected)
}
