//! Immutable copies of the board used for rollback and rendering

use super::state::BoardState;
use crate::types::{Deal, DealId, Position, StageId};

/// A value copy of the board taken at one instant.
///
/// Later moves on the live board never show up in a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    state: BoardState,
}

impl BoardSnapshot {
    pub(crate) fn new(state: BoardState) -> Self {
        Self { state }
    }

    /// The board as it was when the snapshot was taken
    pub fn as_board(&self) -> &BoardState {
        &self.state
    }

    pub fn deal(&self, id: &DealId) -> Option<&Deal> {
        self.state.deal(id)
    }

    pub fn locate(&self, id: &DealId) -> Option<Position> {
        self.state.locate(id)
    }

    /// Deal ids of a stage in display order (empty for unknown stages)
    pub fn deal_ids(&self, stage: &StageId) -> Vec<DealId> {
        self.state
            .stage(stage)
            .map(|list| list.deal_ids().to_vec())
            .unwrap_or_default()
    }

    pub fn into_board(self) -> BoardState {
        self.state
    }
}
