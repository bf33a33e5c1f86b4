//! Resolving optimistic moves against the remote outcome.
//!
//! A commit never touches the board: the optimistic apply already is the
//! final state. A revert moves only the affected deal back, through the same
//! `apply_move` primitive, so moves of other deals that landed in the
//! meantime survive. The snapshot taken before the apply is consulted only
//! when the deal is no longer where the move left it, which the engine's
//! per-deal queue rules out.

use crate::board::{BoardSnapshot, BoardState};
use crate::error::{RemoteError, Result};
use crate::events::BoardEvent;
use crate::types::{MoveRecord, MoveStatus, Position};
use tracing::{debug, error, warn};

/// An optimistic move waiting for its remote confirmation
#[derive(Debug, Clone)]
pub struct PendingMove {
    pub record: MoveRecord,
    /// Board as it was right before the optimistic apply
    pub snapshot: BoardSnapshot,
}

/// Accept a confirmed move. The record is consumed.
pub fn commit(mut pending: PendingMove) -> BoardEvent {
    pending.record.settle(MoveStatus::Committed);
    let record = pending.record;
    debug!(
        deal = %record.deal_id,
        move_id = %record.id,
        stage = %record.requested.stage,
        "move committed"
    );
    BoardEvent::Committed {
        move_id: record.id,
        deal_id: record.deal_id,
        stage: record.requested.stage,
    }
}

/// Undo a move the remote store refused. The record is consumed.
pub fn revert(board: &mut BoardState, mut pending: PendingMove, cause: RemoteError) -> BoardEvent {
    pending.record.settle(MoveStatus::Reverted);
    warn!(
        deal = %pending.record.deal_id,
        move_id = %pending.record.id,
        error = %cause,
        "remote rejected move, reverting"
    );

    match undo(board, &pending) {
        Ok(restored) => BoardEvent::Reverted {
            move_id: pending.record.id,
            deal_id: pending.record.deal_id,
            restored,
            error: cause,
        },
        Err(err) => {
            error!(
                deal = %pending.record.deal_id,
                move_id = %pending.record.id,
                error = %err,
                "could not revert move"
            );
            BoardEvent::Dropped {
                move_id: pending.record.id,
                deal_id: pending.record.deal_id,
                reason: err.to_string(),
            }
        }
    }
}

/// Move the deal back to where the record found it.
///
/// The snapshot branch is for callers driving `BoardState` directly.
/// `TransitionEngine` never takes it: a deal with an unresolved move is only
/// moved again through its queue, after this revert.
fn undo(board: &mut BoardState, pending: &PendingMove) -> Result<Position> {
    let record = &pending.record;
    match board.locate(&record.deal_id) {
        Some(current) if current.stage == record.requested.stage => board.apply_move(
            &record.deal_id,
            &current.stage,
            current.index,
            &record.previous.stage,
            record.previous.index,
        ),
        other => {
            warn!(
                deal = %record.deal_id,
                expected = %record.requested,
                found = ?other,
                "deal moved away from its optimistic position, restoring from snapshot"
            );
            board.restore_deal(&pending.snapshot, &record.deal_id)
        }
    }
}
