//! The canonical board: ordered stage lists plus the deals they reference.

use super::snapshot::BoardSnapshot;
use crate::error::{PipelineError, Result};
use crate::types::{clamp_insert_index, Deal, DealId, Position, StageDef, StageId, StageList};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Outcome of a bulk load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Deals placed on the board
    pub loaded: usize,
    /// Deals dropped because their stage is not part of the pipeline
    pub skipped: usize,
}

/// All stage lists, in pipeline order, and the deals they hold.
///
/// Invariants while settled:
/// - every deal id appears in exactly one stage list
/// - `deal.stage` equals the id of the list containing it
///
/// [`BoardState::apply_move`] is the only way the lists are reordered.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardState {
    stages: IndexMap<StageId, StageList>,
    deals: HashMap<DealId, Deal>,
}

impl BoardState {
    /// Create an empty board with the given stage sequence
    pub fn new(stages: &[StageDef]) -> Self {
        Self {
            stages: empty_lists(stages),
            deals: HashMap::new(),
        }
    }

    /// Create a board populated from a flat deal list
    pub fn from_deals(stages: &[StageDef], deals: impl IntoIterator<Item = Deal>) -> Result<Self> {
        let mut board = Self::new(stages);
        board.replace_all(deals)?;
        Ok(board)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Stage lists in pipeline order
    pub fn stages(&self) -> impl Iterator<Item = &StageList> {
        self.stages.values()
    }

    /// Stage ids in pipeline order
    pub fn stage_ids(&self) -> impl Iterator<Item = &StageId> {
        self.stages.keys()
    }

    pub fn stage(&self, id: &StageId) -> Option<&StageList> {
        self.stages.get(id)
    }

    pub fn is_known_stage(&self, id: &StageId) -> bool {
        self.stages.contains_key(id)
    }

    pub fn deal(&self, id: &DealId) -> Option<&Deal> {
        self.deals.get(id)
    }

    /// Deals of a stage in display order
    pub fn deals_in<'a>(&'a self, stage: &StageId) -> impl Iterator<Item = &'a Deal> + 'a {
        self.stages
            .get(stage)
            .into_iter()
            .flat_map(|list| list.deal_ids().iter())
            .filter_map(|id| self.deals.get(id))
    }

    /// Current stage and index of a deal
    pub fn locate(&self, id: &DealId) -> Option<Position> {
        let stage = &self.deals.get(id)?.stage;
        if let Some(index) = self.stages.get(stage).and_then(|list| list.position_of(id)) {
            return Some(Position::new(stage.clone(), index));
        }
        // The stage field disagrees with membership; fall back to a scan.
        self.stages.values().find_map(|list| {
            list.position_of(id)
                .map(|index| Position::new(list.id.clone(), index))
        })
    }

    /// Number of deals on the board
    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Move one deal from `from_stage[from_index]` to `to_stage[to_index]`.
    ///
    /// The deal at the source index must be `deal_id`, otherwise nothing is
    /// touched and [`PipelineError::InconsistentState`] is returned. The
    /// destination index is clamped to the destination list. Returns the
    /// position the deal ended up at.
    pub fn apply_move(
        &mut self,
        deal_id: &DealId,
        from_stage: &StageId,
        from_index: usize,
        to_stage: &StageId,
        to_index: usize,
    ) -> Result<Position> {
        let source = self
            .stages
            .get(from_stage)
            .ok_or_else(|| stage_not_found(from_stage))?;
        let found = source.get(from_index);
        if found != Some(deal_id) || !self.deals.contains_key(deal_id) {
            return Err(PipelineError::inconsistent(
                deal_id.as_str(),
                from_stage.as_str(),
                from_index,
                found.map(|id| id.to_string()),
            ));
        }
        if !self.stages.contains_key(to_stage) {
            return Err(stage_not_found(to_stage));
        }

        let removed = self
            .stages
            .get_mut(from_stage)
            .ok_or_else(|| stage_not_found(from_stage))?
            .remove(from_index);
        let destination = self
            .stages
            .get_mut(to_stage)
            .ok_or_else(|| stage_not_found(to_stage))?;
        let index = clamp_insert_index(to_index, destination.len());
        destination.insert(index, removed);

        if let Some(deal) = self.deals.get_mut(deal_id) {
            deal.stage = to_stage.clone();
        }

        debug!(
            deal = %deal_id,
            from = %from_stage,
            from_index,
            to = %to_stage,
            to_index = index,
            "applied move"
        );
        Ok(Position::new(to_stage.clone(), index))
    }

    /// Take an independent copy for rollback or rendering
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::new(self.clone())
    }

    /// Replace every deal on the board with a freshly loaded set.
    ///
    /// Deals keep the order they arrive in within their stage. Deals for
    /// unknown stages are skipped. A duplicate id fails the whole load and
    /// leaves the board untouched.
    pub fn replace_all(&mut self, deals: impl IntoIterator<Item = Deal>) -> Result<LoadSummary> {
        let mut stages = self.stages.clone();
        for list in stages.values_mut() {
            *list = StageList::new(&StageDef::new(list.id.clone(), list.title.clone()));
        }
        let mut by_id = HashMap::new();
        let mut summary = LoadSummary::default();

        for deal in deals {
            let Some(list) = stages.get_mut(&deal.stage) else {
                warn!(deal = %deal.id, stage = %deal.stage, "skipping deal in unknown stage");
                summary.skipped += 1;
                continue;
            };
            if by_id.contains_key(&deal.id) {
                return Err(PipelineError::duplicate_id("deal", deal.id.as_str()));
            }
            list.push(deal.id.clone());
            by_id.insert(deal.id.clone(), deal);
            summary.loaded += 1;
        }

        self.stages = stages;
        self.deals = by_id;
        Ok(summary)
    }

    /// Put one deal back where a snapshot had it, leaving every other deal
    /// where it is now. Used when a revert cannot be expressed as a move.
    ///
    /// `TransitionEngine` does not reach this path; it serves callers that
    /// mutate the board outside the engine's per-deal queue.
    pub fn restore_deal(&mut self, snapshot: &BoardSnapshot, deal_id: &DealId) -> Result<Position> {
        let previous = snapshot.locate(deal_id).ok_or_else(|| {
            PipelineError::inconsistent(deal_id.as_str(), "<snapshot>", 0, None)
        })?;
        let mut deal = match self.deals.get(deal_id) {
            Some(current) => current.clone(),
            None => snapshot.deal(deal_id).cloned().ok_or_else(|| {
                PipelineError::inconsistent(deal_id.as_str(), previous.stage.as_str(), previous.index, None)
            })?,
        };

        for list in self.stages.values_mut() {
            list.remove_id(deal_id);
        }
        let list = self
            .stages
            .get_mut(&previous.stage)
            .ok_or_else(|| stage_not_found(&previous.stage))?;
        let index = clamp_insert_index(previous.index, list.len());
        list.insert(index, deal_id.clone());

        deal.stage = previous.stage.clone();
        self.deals.insert(deal_id.clone(), deal);
        Ok(Position::new(previous.stage, index))
    }

    /// Check the membership invariants
    pub fn verify(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for list in self.stages.values() {
            for (index, id) in list.deal_ids().iter().enumerate() {
                if !seen.insert(id) {
                    return Err(PipelineError::duplicate_id("deal", id.as_str()));
                }
                match self.deals.get(id) {
                    Some(deal) if deal.stage == list.id => {}
                    Some(deal) => {
                        return Err(PipelineError::inconsistent(
                            id.as_str(),
                            deal.stage.as_str(),
                            index,
                            Some(format!("it in stage {}", list.id)),
                        ))
                    }
                    None => {
                        return Err(PipelineError::inconsistent(
                            id.as_str(),
                            list.id.as_str(),
                            index,
                            None,
                        ))
                    }
                }
            }
        }
        if let Some(orphan) = self.deals.keys().find(|id| !seen.contains(id)) {
            return Err(PipelineError::inconsistent(orphan.as_str(), "<any>", 0, None));
        }
        Ok(())
    }
}

fn empty_lists(stages: &[StageDef]) -> IndexMap<StageId, StageList> {
    stages
        .iter()
        .map(|def| (def.id.clone(), StageList::new(def)))
        .collect()
}

fn stage_not_found(id: &StageId) -> PipelineError {
    PipelineError::StageNotFound { id: id.to_string() }
}
