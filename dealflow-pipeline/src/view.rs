//! Render output: what the board UI draws

use crate::board::BoardState;
use crate::types::{Deal, DealId, StageId};
use serde::Serialize;

/// Count and value of a group of deals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageMetrics {
    pub count: usize,
    pub total_value: f64,
    /// Sum of `value * probability / 100`
    pub weighted_value: f64,
}

impl StageMetrics {
    fn add(&mut self, deal: &Deal) {
        self.count += 1;
        self.total_value += deal.value;
        self.weighted_value += deal.weighted_value();
    }

    fn merge(&mut self, other: &StageMetrics) {
        self.count += other.count;
        self.total_value += other.total_value;
        self.weighted_value += other.weighted_value;
    }
}

/// One card on the board
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealCard {
    #[serde(flatten)]
    pub deal: Deal,
    /// Shown at a position the remote store has not confirmed yet
    pub pending: bool,
    /// The deal's last move was refused and undone
    pub reverted: bool,
}

/// One column of the board
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    pub id: StageId,
    pub title: String,
    pub cards: Vec<DealCard>,
    pub metrics: StageMetrics,
}

/// The whole board, stages in pipeline order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub stages: Vec<StageView>,
    pub totals: StageMetrics,
}

impl BoardView {
    /// Build a view of the board, flagging cards through the given predicates
    pub fn build(
        board: &BoardState,
        is_pending: impl Fn(&DealId) -> bool,
        is_reverted: impl Fn(&DealId) -> bool,
    ) -> Self {
        let mut totals = StageMetrics::default();
        let stages = board
            .stages()
            .map(|list| {
                let mut metrics = StageMetrics::default();
                let cards = board
                    .deals_in(&list.id)
                    .map(|deal| {
                        metrics.add(deal);
                        DealCard {
                            deal: deal.clone(),
                            pending: is_pending(&deal.id),
                            reverted: is_reverted(&deal.id),
                        }
                    })
                    .collect();
                totals.merge(&metrics);
                StageView {
                    id: list.id.clone(),
                    title: list.title.clone(),
                    cards,
                    metrics,
                }
            })
            .collect();

        Self { stages, totals }
    }

    pub fn stage(&self, id: &StageId) -> Option<&StageView> {
        self.stages.iter().find(|s| &s.id == id)
    }

    pub fn card(&self, id: &DealId) -> Option<&DealCard> {
        self.stages
            .iter()
            .flat_map(|s| s.cards.iter())
            .find(|c| &c.deal.id == id)
    }
}
