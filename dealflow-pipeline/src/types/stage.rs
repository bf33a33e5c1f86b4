//! Stage types: the configured stage definition and its ordered deal list

use super::ids::{DealId, StageId};
use serde::{Deserialize, Serialize};

/// A stage of the pipeline as configured.
///
/// The sequence of stage definitions is domain configuration; it never
/// changes while a board is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDef {
    pub id: StageId,
    pub title: String,
}

impl StageDef {
    pub fn new(id: impl Into<StageId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Ordered membership of one stage. Holds deal ids only; the deals
/// themselves live in the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageList {
    pub id: StageId,
    pub title: String,
    deals: Vec<DealId>,
}

impl StageList {
    /// Create an empty list for a stage definition
    pub fn new(def: &StageDef) -> Self {
        Self {
            id: def.id.clone(),
            title: def.title.clone(),
            deals: Vec::new(),
        }
    }

    /// Deal ids in display order
    pub fn deal_ids(&self) -> &[DealId] {
        &self.deals
    }

    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    /// Deal id at an index, if any
    pub fn get(&self, index: usize) -> Option<&DealId> {
        self.deals.get(index)
    }

    /// Index of a deal in this list
    pub fn position_of(&self, id: &DealId) -> Option<usize> {
        self.deals.iter().position(|d| d == id)
    }

    pub(crate) fn push(&mut self, id: DealId) {
        self.deals.push(id);
    }

    pub(crate) fn insert(&mut self, index: usize, id: DealId) {
        self.deals.insert(index, id);
    }

    pub(crate) fn remove(&mut self, index: usize) -> DealId {
        self.deals.remove(index)
    }

    /// Drop every occurrence of a deal id, returning how many were removed
    pub(crate) fn remove_id(&mut self, id: &DealId) -> usize {
        let before = self.deals.len();
        self.deals.retain(|d| d != id);
        before - self.deals.len()
    }
}
