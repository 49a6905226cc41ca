//! "Most recent event" selection over a client's communication history.
//!
//! Ordering is by effective time; a communication with no usable timestamp
//! sorts before every dated one. Remaining ties go to the entry that appears
//! later in the client's list.

use std::cmp::Ordering;

use serde::Serialize;

use crate::model::{Client, Communication, CommunicationResult, CommunicationStatus};

/// Current state of the deal with a client, derived from its latest
/// communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    InProgress,
    Success,
    Refused,
}

impl DealStatus {
    /// Map a stored `communicationStatus` string; unknown values give `None`.
    pub fn from_stored(s: &str) -> Option<Self> {
        match s.trim() {
            "in_progress" | "planned" => Some(DealStatus::InProgress),
            "success" => Some(DealStatus::Success),
            "refused" | "failed" => Some(DealStatus::Refused),
            _ => None,
        }
    }

    pub fn of(comm: &Communication) -> Self {
        if comm.status == CommunicationStatus::Planned {
            DealStatus::InProgress
        } else if comm.result == Some(CommunicationResult::Success) {
            DealStatus::Success
        } else {
            DealStatus::Refused
        }
    }
}

/// Recency comparator: effective time ascending, then closed after planned,
/// so that `max_by` picks the latest and prefers closed on equal times.
pub fn compare_recency(a: &Communication, b: &Communication) -> Ordering {
    a.effective_time()
        .cmp(&b.effective_time())
        .then_with(|| a.is_closed().cmp(&b.is_closed()))
}

/// The communication that defines the client's current deal state.
pub fn latest_communication(comms: &[Communication]) -> Option<&Communication> {
    // `max_by` keeps the last of several equal maxima.
    comms.iter().max_by(|a, b| compare_recency(a, b))
}

/// Reason of the most recent closed, failed communication.
pub fn latest_failed_reason(client: &Client) -> Option<&str> {
    client
        .communications
        .iter()
        .filter_map(|c| c.failed_reason().map(|r| (c.effective_time(), r)))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, reason)| reason)
}

/// Current deal status of a client. Clients without a communication history
/// fall back to the stored `communicationStatus`.
pub fn deal_status(client: &Client) -> Option<DealStatus> {
    match latest_communication(&client.communications) {
        Some(comm) => Some(DealStatus::of(comm)),
        None => client
            .communication_status
            .as_deref()
            .and_then(DealStatus::from_stored),
    }
}
