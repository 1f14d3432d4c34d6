//! Deterministic choices between competing requests.

use crate::foundation::TaskId;
use std::cmp::Ordering;

/// A conditioned request supersedes the stored one only with strictly more signatures.
pub fn supersedes(stored_max_sigs: Option<u32>, sigs: u32) -> bool {
    match stored_max_sigs {
        None => true,
        Some(max_sigs) => sigs > max_sigs,
    }
}

/// The oracle counter-signs once its own signature completes the threshold.
pub fn completes_threshold(present_sigs: u32, req_sigs: u32) -> bool {
    present_sigs.saturating_add(1) >= req_sigs
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GuessCandidate {
    pub task_id: TaskId,
    pub received_time: u64,
}

/// Guess precedence: earliest `received_time` wins, ties go to the lowest task id.
pub fn guess_precedence(a: &GuessCandidate, b: &GuessCandidate) -> Ordering {
    a.received_time.cmp(&b.received_time).then(a.task_id.cmp(&b.task_id))
}

pub fn select_guess_winner(candidates: &[GuessCandidate]) -> Option<GuessCandidate> {
    candidates.iter().copied().min_by(guess_precedence)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConditionedCandidate {
    pub task_id: TaskId,
    pub sigs: u32,
}

/// Highest signature count survives; ties go to the newest task.
pub fn select_conditioned_survivor(candidates: &[ConditionedCandidate]) -> Option<ConditionedCandidate> {
    candidates.iter().copied().max_by(|a, b| a.sigs.cmp(&b.sigs).then(a.task_id.cmp(&b.task_id)))
}
