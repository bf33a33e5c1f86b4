//! Move requests and the drag-and-drop payload they are built from

use super::ids::{DealId, StageId};
use super::position::Position;
use serde::{Deserialize, Serialize};

/// A user's intent to relocate one deal.
///
/// Produced once per drag gesture and consumed immediately by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub deal_id: DealId,
    pub from_stage: StageId,
    pub from_index: usize,
    pub to_stage: StageId,
    pub to_index: usize,
}

impl MoveRequest {
    /// Create a new move request
    pub fn new(
        deal_id: impl Into<DealId>,
        from_stage: impl Into<StageId>,
        from_index: usize,
        to_stage: impl Into<StageId>,
        to_index: usize,
    ) -> Self {
        Self {
            deal_id: deal_id.into(),
            from_stage: from_stage.into(),
            from_index,
            to_stage: to_stage.into(),
            to_index,
        }
    }

    /// Build a request from a completed drop.
    ///
    /// Returns `None` when the card was dropped outside any stage.
    pub fn from_drop(drop: &DropResult) -> Option<Self> {
        let destination = drop.destination.as_ref()?;
        Some(Self {
            deal_id: drop.draggable_id.clone(),
            from_stage: drop.source.droppable_id.clone(),
            from_index: drop.source.index,
            to_stage: destination.droppable_id.clone(),
            to_index: destination.index,
        })
    }

    pub fn source(&self) -> Position {
        Position::new(self.from_stage.clone(), self.from_index)
    }

    pub fn destination(&self) -> Position {
        Position::new(self.to_stage.clone(), self.to_index)
    }

    pub fn is_same_stage(&self) -> bool {
        self.from_stage == self.to_stage
    }
}

/// One end of a drag gesture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragLocation {
    pub droppable_id: StageId,
    pub index: usize,
}

/// Result of a drag gesture as reported by the board UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropResult {
    pub draggable_id: DealId,
    pub source: DragLocation,
    #[serde(default)]
    pub destination: Option<DragLocation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_drop() {
        let drop: DropResult = serde_json::from_str(
            r#"{
                "draggableId": "d-1",
                "source": {"droppableId": "prospect", "index": 0},
                "destination": {"droppableId": "qualification", "index": 2}
            }"#,
        )
        .unwrap();

        let request = MoveRequest::from_drop(&drop).unwrap();
        assert_eq!(request, MoveRequest::new("d-1", "prospect", 0, "qualification", 2));
        assert!(!request.is_same_stage());
    }

    #[test]
    fn test_drop_outside_is_ignored() {
        let drop: DropResult = serde_json::from_str(
            r#"{
                "draggableId": "d-1",
                "source": {"droppableId": "prospect", "index": 0},
                "destination": null
            }"#,
        )
        .unwrap();
        assert!(MoveRequest::from_drop(&drop).is_none());
    }
}
