//! In-flight move tracking

use super::ids::{DealId, MoveId};
use super::position::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confirmation status of an optimistic move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStatus {
    /// Applied locally, waiting for the remote store
    Pending,
    /// Confirmed by the remote store
    Committed,
    /// Rejected by the remote store and undone locally
    Reverted,
}

impl MoveStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Tracks one optimistic move from apply to resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub id: MoveId,
    pub deal_id: DealId,
    /// Where the deal was before the optimistic apply
    pub previous: Position,
    /// Where the optimistic apply put it
    pub requested: Position,
    pub status: MoveStatus,
    pub applied_at: DateTime<Utc>,
}

impl MoveRecord {
    pub(crate) fn pending(id: MoveId, deal_id: DealId, previous: Position, requested: Position) -> Self {
        Self {
            id,
            deal_id,
            previous,
            requested,
            status: MoveStatus::Pending,
            applied_at: Utc::now(),
        }
    }

    /// Move a pending record into a terminal status. Terminal records stay put.
    pub(crate) fn settle(&mut self, status: MoveStatus) {
        if self.status == MoveStatus::Pending {
            self.status = status;
        }
    }

    /// Whether the move changed stage membership
    pub fn crosses_stages(&self) -> bool {
        self.previous.stage != self.requested.stage
    }
}
