use crate::domain::protocol::Operation;
use crate::foundation::{OracleError, Pwtxid, Result, Rqhs, TaskId, GUESS_FILTER_PREFIX, RQHS_FILTER_PREFIX, TASK_PARKED_NEXT_CHECK};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Durable unit of deferred work. `payload` is handler-defined JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub operation: Operation,
    pub payload: String,
    pub done: bool,
    pub next_check: u64,
    pub filter_field: Option<String>,
    pub created_at: u64,
}

impl Task {
    pub fn is_due(&self, now: u64) -> bool {
        !self.done && self.next_check <= now
    }

    pub fn is_parked(&self) -> bool {
        !self.done && self.next_check == TASK_PARKED_NEXT_CHECK
    }

    /// Payloads are written by the handlers themselves, so a decode failure is an invariant violation.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.payload)
            .map_err(|err| OracleError::invariant(format!("{} task payload id={}", self.operation, self.id), err))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTask {
    pub operation: Operation,
    pub payload: String,
    pub next_check: u64,
    pub filter_field: Option<String>,
}

impl NewTask {
    pub fn new<P: Serialize>(operation: Operation, payload: &P, next_check: u64) -> Result<Self> {
        let payload = serde_json::to_string(payload)?;
        Ok(Self { operation, payload, next_check, filter_field: None })
    }

    pub fn with_filter(mut self, filter_field: impl Into<String>) -> Self {
        self.filter_field = Some(filter_field.into());
        self
    }

    pub fn into_task(self, id: TaskId, created_at: u64) -> Task {
        Task {
            id,
            operation: self.operation,
            payload: self.payload,
            done: false,
            next_check: self.next_check,
            filter_field: self.filter_field,
            created_at,
        }
    }
}

pub fn guess_filter(pwtxid: &Pwtxid) -> String {
    format!("{}:{}", GUESS_FILTER_PREFIX, pwtxid)
}

pub fn rqhs_filter(rqhs: &Rqhs) -> String {
    format!("{}:{}", RQHS_FILTER_PREFIX, rqhs)
}
