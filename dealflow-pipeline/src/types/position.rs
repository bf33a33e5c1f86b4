//! Positions on the board and index arithmetic for moves.

use super::ids::StageId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a deal sits: stage + index within the stage list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub stage: StageId,
    pub index: usize,
}

impl Position {
    /// Create a new position
    pub fn new(stage: impl Into<StageId>, index: usize) -> Self {
        Self {
            stage: stage.into(),
            index,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.stage, self.index)
    }
}

/// Largest valid destination index for a move.
///
/// `dest_len` is the destination list length before the move. Moving within
/// the same stage removes the deal first, so the last slot disappears.
pub fn max_destination_index(dest_len: usize, same_stage: bool) -> usize {
    if same_stage {
        dest_len.saturating_sub(1)
    } else {
        dest_len
    }
}

/// Clamp an insertion index into `[0, len]`
pub fn clamp_insert_index(index: usize, len: usize) -> usize {
    index.min(len)
}
