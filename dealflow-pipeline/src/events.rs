//! Notifications emitted as moves progress

use crate::error::RemoteError;
use crate::types::{DealId, MoveId, Position, StageId};

/// Something that happened on the board.
///
/// `Reverted` is the user-facing failure notification for one deal; nothing
/// in this crate raises a board-wide error state.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    /// A move was applied optimistically
    Applied {
        move_id: MoveId,
        deal_id: DealId,
        from: Position,
        to: Position,
    },
    /// A move is waiting for an earlier move of the same deal to resolve
    Queued { move_id: MoveId, deal_id: DealId },
    /// The move is final
    Committed {
        move_id: MoveId,
        deal_id: DealId,
        stage: StageId,
    },
    /// The remote store refused the move and the deal went back
    Reverted {
        move_id: MoveId,
        deal_id: DealId,
        restored: Position,
        error: RemoteError,
    },
    /// A move was abandoned without touching the board
    Dropped {
        move_id: MoveId,
        deal_id: DealId,
        reason: String,
    },
    /// The board was replaced by a bulk load
    Refreshed {
        loaded: usize,
        skipped: usize,
        discarded: usize,
    },
}

impl BoardEvent {
    pub fn move_id(&self) -> Option<MoveId> {
        match self {
            Self::Applied { move_id, .. }
            | Self::Queued { move_id, .. }
            | Self::Committed { move_id, .. }
            | Self::Reverted { move_id, .. }
            | Self::Dropped { move_id, .. } => Some(*move_id),
            Self::Refreshed { .. } => None,
        }
    }

    pub fn deal_id(&self) -> Option<&DealId> {
        match self {
            Self::Applied { deal_id, .. }
            | Self::Queued { deal_id, .. }
            | Self::Committed { deal_id, .. }
            | Self::Reverted { deal_id, .. }
            | Self::Dropped { deal_id, .. } => Some(deal_id),
            Self::Refreshed { .. } => None,
        }
    }

    /// Whether this event ends a move's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Committed { .. } | Self::Reverted { .. } | Self::Dropped { .. }
        )
    }
}
