//! Transition engine: turns move requests into board changes and remote calls.
//!
//! The engine is synchronous. It never talks to the network itself; every
//! state change returns a [`Step`] describing the events to publish and, at
//! most, one [`StageUpdate`] the caller must send to the remote store and
//! feed back through [`TransitionEngine::resolve`].
//!
//! Per deal, at most one stage update is outstanding. Requests for a deal
//! with an unresolved move wait in a queue and are started, re-based on
//! wherever the deal ended up, once the earlier move resolves.

use crate::board::{BoardState, LoadSummary};
use crate::error::{InvalidMoveReason, PipelineError, RemoteError, Result};
use crate::events::BoardEvent;
use crate::reconcile::{self, PendingMove};
use crate::types::{
    max_destination_index, Deal, DealId, MoveId, MoveRecord, MoveRequest, MoveStatus, StageDef,
    StageId,
};
use crate::view::BoardView;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, error, info, warn};

/// Remote call the caller must issue: set `deal_id`'s stage to `stage`.
///
/// Carries no index; order inside a stage is client-local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageUpdate {
    pub move_id: MoveId,
    pub deal_id: DealId,
    pub stage: StageId,
}

/// Output of one engine transition
#[derive(Debug, Default)]
pub struct Step {
    pub events: Vec<BoardEvent>,
    pub call: Option<StageUpdate>,
}

#[derive(Debug)]
struct QueuedMove {
    id: MoveId,
    request: MoveRequest,
}

/// Owns the board and every move that has not resolved yet
#[derive(Debug)]
pub struct TransitionEngine {
    board: BoardState,
    in_flight: HashMap<DealId, PendingMove>,
    queued: HashMap<DealId, VecDeque<QueuedMove>>,
    reverted: HashSet<DealId>,
    next_move: u64,
}

impl TransitionEngine {
    /// Create an engine with an empty board
    pub fn new(stages: &[StageDef]) -> Self {
        Self::with_board(BoardState::new(stages))
    }

    /// Create an engine around an existing board
    pub fn with_board(board: BoardState) -> Self {
        Self {
            board,
            in_flight: HashMap::new(),
            queued: HashMap::new(),
            reverted: HashSet::new(),
            next_move: 1,
        }
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    /// Render-ready view of the current board
    pub fn view(&self) -> BoardView {
        BoardView::build(
            &self.board,
            |id| self.is_pending(id),
            |id| self.was_reverted(id),
        )
    }

    // =========================================================================
    // Move lifecycle
    // =========================================================================

    /// Check a request against the current board without changing anything
    pub fn validate(&self, request: &MoveRequest) -> Result<()> {
        let reject = |reason| Err(PipelineError::invalid_move(request.deal_id.as_str(), reason));

        if self.board.deal(&request.deal_id).is_none() {
            return reject(InvalidMoveReason::UnknownDeal);
        }
        let Some(source) = self.board.stage(&request.from_stage) else {
            return reject(InvalidMoveReason::UnknownSourceStage {
                stage: request.from_stage.to_string(),
            });
        };
        let Some(destination) = self.board.stage(&request.to_stage) else {
            return reject(InvalidMoveReason::UnknownDestinationStage {
                stage: request.to_stage.to_string(),
            });
        };
        if source.get(request.from_index) != Some(&request.deal_id) {
            return reject(InvalidMoveReason::SourceMismatch {
                stage: request.from_stage.to_string(),
                index: request.from_index,
            });
        }
        let max = max_destination_index(destination.len(), request.is_same_stage());
        if request.to_index > max {
            return reject(InvalidMoveReason::IndexOutOfRange {
                index: request.to_index,
                max,
            });
        }
        Ok(())
    }

    /// Validate and start (or queue) a move.
    ///
    /// On error the board is unchanged and no remote call is requested.
    pub fn request(&mut self, request: MoveRequest) -> Result<(MoveId, Step)> {
        if let Err(err) = self.validate(&request) {
            debug!(deal = %request.deal_id, error = %err, "move rejected");
            return Err(err);
        }

        let id = MoveId::new(self.next_move);
        self.next_move += 1;
        let mut step = Step::default();

        if self.in_flight.contains_key(&request.deal_id) {
            debug!(deal = %request.deal_id, move_id = %id, "queued behind unresolved move");
            step.events.push(BoardEvent::Queued {
                move_id: id,
                deal_id: request.deal_id.clone(),
            });
            self.queued
                .entry(request.deal_id.clone())
                .or_default()
                .push_back(QueuedMove { id, request });
            return Ok((id, step));
        }

        if let Err(err) = self.start(id, request, false, &mut step) {
            error!(move_id = %id, error = %err, "optimistic apply skipped");
            return Err(err);
        }
        Ok((id, step))
    }

    /// Feed back the remote outcome of a stage update.
    ///
    /// Outcomes for moves that are no longer tracked (superseded by a
    /// refresh) are ignored.
    pub fn resolve(
        &mut self,
        move_id: MoveId,
        deal_id: &DealId,
        outcome: std::result::Result<(), RemoteError>,
    ) -> Step {
        let mut step = Step::default();

        let current = self.in_flight.get(deal_id).map(|p| p.record.id);
        if current != Some(move_id) {
            warn!(deal = %deal_id, move_id = %move_id, "ignoring outcome of superseded move");
            return step;
        }
        let Some(pending) = self.in_flight.remove(deal_id) else {
            return step;
        };

        let event = match outcome {
            Ok(()) => reconcile::commit(pending),
            Err(cause) => {
                self.reverted.insert(deal_id.clone());
                reconcile::revert(&mut self.board, pending, cause)
            }
        };
        step.events.push(event);

        self.release_queued(deal_id, &mut step);
        step
    }

    /// Replace the board with a fresh bulk load.
    ///
    /// Every unresolved and queued move is forgotten; their remote outcomes
    /// will be ignored when they arrive.
    pub fn replace_all(
        &mut self,
        deals: impl IntoIterator<Item = Deal>,
    ) -> Result<(LoadSummary, Step)> {
        let summary = self.board.replace_all(deals)?;
        let discarded =
            self.in_flight.len() + self.queued.values().map(VecDeque::len).sum::<usize>();

        self.in_flight.clear();
        self.queued.clear();
        self.reverted.clear();

        info!(
            loaded = summary.loaded,
            skipped = summary.skipped,
            discarded,
            "board replaced"
        );
        let step = Step {
            events: vec![BoardEvent::Refreshed {
                loaded: summary.loaded,
                skipped: summary.skipped,
                discarded,
            }],
            call: None,
        };
        Ok((summary, step))
    }

    // =========================================================================
    // Render queries
    // =========================================================================

    /// Whether the deal has a move that is not confirmed yet
    pub fn is_pending(&self, deal_id: &DealId) -> bool {
        self.in_flight.contains_key(deal_id) || self.queued.contains_key(deal_id)
    }

    /// The unresolved move of a deal, if any
    pub fn pending(&self, deal_id: &DealId) -> Option<&MoveRecord> {
        self.in_flight.get(deal_id).map(|p| &p.record)
    }

    /// Number of deals waiting for a remote confirmation
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of moves waiting behind an unresolved move of the same deal
    pub fn queued_count(&self, deal_id: &DealId) -> usize {
        self.queued.get(deal_id).map_or(0, VecDeque::len)
    }

    /// Whether the deal's last move was reverted
    pub fn was_reverted(&self, deal_id: &DealId) -> bool {
        self.reverted.contains(deal_id)
    }

    /// Clear the reverted marker once the UI has shown it
    pub fn acknowledge_revert(&mut self, deal_id: &DealId) -> bool {
        self.reverted.remove(deal_id)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Apply a move optimistically. Rebased moves take their source from the
    /// deal's current location instead of the request.
    fn start(&mut self, id: MoveId, request: MoveRequest, rebase: bool, step: &mut Step) -> Result<()> {
        let previous = if rebase {
            self.board.locate(&request.deal_id).ok_or_else(|| {
                PipelineError::inconsistent(
                    request.deal_id.as_str(),
                    request.from_stage.as_str(),
                    request.from_index,
                    None,
                )
            })?
        } else {
            request.source()
        };

        let snapshot = self.board.snapshot();
        let requested = self.board.apply_move(
            &request.deal_id,
            &previous.stage,
            previous.index,
            &request.to_stage,
            request.to_index,
        )?;
        self.reverted.remove(&request.deal_id);

        step.events.push(BoardEvent::Applied {
            move_id: id,
            deal_id: request.deal_id.clone(),
            from: previous.clone(),
            to: requested.clone(),
        });

        let mut record = MoveRecord::pending(id, request.deal_id, previous, requested);
        if !record.crosses_stages() {
            record.settle(MoveStatus::Committed);
            debug!(deal = %record.deal_id, move_id = %id, "reordered within stage");
            step.events.push(BoardEvent::Committed {
                move_id: id,
                deal_id: record.deal_id,
                stage: record.requested.stage,
            });
            return Ok(());
        }

        debug!(
            deal = %record.deal_id,
            move_id = %id,
            from = %record.previous,
            to = %record.requested,
            "move pending confirmation"
        );
        step.call = Some(StageUpdate {
            move_id: id,
            deal_id: record.deal_id.clone(),
            stage: record.requested.stage.clone(),
        });
        self.in_flight
            .insert(record.deal_id.clone(), PendingMove { record, snapshot });
        Ok(())
    }

    /// Start queued moves for a deal until one needs a remote call
    fn release_queued(&mut self, deal_id: &DealId, step: &mut Step) {
        while step.call.is_none() {
            let Some(next) = self.queued.get_mut(deal_id).and_then(VecDeque::pop_front) else {
                break;
            };
            let id = next.id;
            if let Err(err) = self.start(id, next.request, true, step) {
                error!(deal = %deal_id, move_id = %id, error = %err, "dropping queued move");
                step.events.push(BoardEvent::Dropped {
                    move_id: id,
                    deal_id: deal_id.clone(),
                    reason: err.to_string(),
                });
            }
        }
        if self.queued.get(deal_id).is_some_and(VecDeque::is_empty) {
            self.queued.remove(deal_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn stages() -> Vec<StageDef> {
        vec![
            StageDef::new("a", "A"),
            StageDef::new("b", "B"),
            StageDef::new("c", "C"),
        ]
    }

    /// `A:[x,y]`, `B:[z]`, `C:[]`
    fn engine() -> TransitionEngine {
        let board = BoardState::from_deals(
            &stages(),
            vec![
                Deal::new("X", "a").with_id("x"),
                Deal::new("Y", "a").with_id("y"),
                Deal::new("Z", "b").with_id("z"),
            ],
        )
        .unwrap();
        TransitionEngine::with_board(board)
    }

    fn order(engine: &TransitionEngine, stage: &str) -> Vec<String> {
        engine
            .board()
            .deals_in(&StageId::from(stage))
            .map(|d| d.id.to_string())
            .collect()
    }

    fn failure() -> RemoteError {
        RemoteError::network("connection reset")
    }

    #[test]
    fn test_optimistic_apply_then_commit() {
        let mut engine = engine();
        let (id, step) = engine
            .request(MoveRequest::new("x", "a", 0, "b", 1))
            .unwrap();

        assert_eq!(order(&engine, "a"), ["y"]);
        assert_eq!(order(&engine, "b"), ["z", "x"]);
        let call = step.call.unwrap();
        assert_eq!(call.stage.as_str(), "b");
        assert!(engine.is_pending(&"x".into()));
        assert_eq!(engine.pending(&"x".into()).unwrap().status, MoveStatus::Pending);

        let step = engine.resolve(id, &"x".into(), Ok(()));

        assert!(matches!(step.events[..], [BoardEvent::Committed { .. }]));
        assert!(step.call.is_none());
        assert_eq!(order(&engine, "a"), ["y"]);
        assert_eq!(order(&engine, "b"), ["z", "x"]);
        assert!(!engine.is_pending(&"x".into()));
        engine.board().verify().unwrap();
    }

    #[test]
    fn test_optimistic_apply_then_revert() {
        let mut engine = engine();
        let before = engine.board().snapshot();
        let (id, _) = engine
            .request(MoveRequest::new("x", "a", 0, "b", 1))
            .unwrap();

        let step = engine.resolve(id, &"x".into(), Err(failure()));

        assert!(matches!(step.events[..], [BoardEvent::Reverted { .. }]));
        assert_eq!(engine.board().snapshot(), before);
        assert!(engine.was_reverted(&"x".into()));
        assert!(engine.view().card(&"x".into()).unwrap().reverted);
    }

    #[test]
    fn test_rejected_requests_change_nothing() {
        let mut engine = engine();
        let before = engine.board().snapshot();

        let cases = [
            MoveRequest::new("x", "a", 0, "b", 2),
            MoveRequest::new("x", "a", 0, "won", 0),
            MoveRequest::new("x", "a", 1, "b", 0),
            MoveRequest::new("x", "lost", 0, "b", 0),
            MoveRequest::new("ghost", "a", 0, "b", 0),
            MoveRequest::new("x", "a", 0, "a", 2),
        ];
        for request in cases {
            let err = engine.request(request).unwrap_err();
            assert!(err.is_invalid_move(), "{err}");
        }

        assert_eq!(engine.board().snapshot(), before);
        assert_eq!(engine.in_flight_count(), 0);
    }

    #[test]
    fn test_destination_boundary_is_inclusive() {
        let mut engine = engine();
        // Cross-stage: index == len is the end slot
        engine.request(MoveRequest::new("y", "a", 1, "b", 1)).unwrap();
        // Same stage: removal shrinks the list, so len - 1 is the end slot
        engine.request(MoveRequest::new("x", "a", 0, "a", 0)).unwrap();
        assert_eq!(order(&engine, "b"), ["z", "y"]);
    }

    #[test]
    fn test_same_stage_reorder_commits_locally() {
        let mut engine = engine();
        let (_, step) = engine
            .request(MoveRequest::new("x", "a", 0, "a", 1))
            .unwrap();

        assert!(step.call.is_none());
        assert!(matches!(
            step.events[..],
            [BoardEvent::Applied { .. }, BoardEvent::Committed { .. }]
        ));
        assert_eq!(order(&engine, "a"), ["y", "x"]);
        assert!(!engine.is_pending(&"x".into()));
    }

    #[test]
    fn test_second_move_waits_for_first() {
        let mut engine = engine();
        let (first, step) = engine
            .request(MoveRequest::new("x", "a", 0, "b", 0))
            .unwrap();
        assert!(step.call.is_some());

        // The UI shows x at b[0]; the user drags it on to c
        let (second, step) = engine
            .request(MoveRequest::new("x", "b", 0, "c", 0))
            .unwrap();
        assert!(step.call.is_none());
        assert!(matches!(step.events[..], [BoardEvent::Queued { .. }]));
        assert_eq!(engine.queued_count(&"x".into()), 1);
        assert_eq!(order(&engine, "b"), ["x", "z"]);

        let step = engine.resolve(first, &"x".into(), Ok(()));
        let call = step.call.expect("queued move starts");
        assert_eq!(call.move_id, second);
        assert_eq!(call.stage.as_str(), "c");
        assert_eq!(order(&engine, "c"), ["x"]);

        engine.resolve(second, &"x".into(), Ok(()));
        assert!(!engine.is_pending(&"x".into()));
        engine.board().verify().unwrap();
    }

    #[test]
    fn test_queued_move_rebases_after_revert() {
        let mut engine = engine();
        let (first, _) = engine
            .request(MoveRequest::new("x", "a", 0, "b", 0))
            .unwrap();
        let (second, _) = engine
            .request(MoveRequest::new("x", "b", 0, "c", 0))
            .unwrap();

        let step = engine.resolve(first, &"x".into(), Err(failure()));

        // Reverted to a[0], then the queued move starts from there
        let call = step.call.unwrap();
        assert_eq!(call.move_id, second);
        match &step.events[..] {
            [BoardEvent::Reverted { .. }, BoardEvent::Applied { from, .. }] => {
                assert_eq!(*from, Position::new("a", 0));
            }
            other => panic!("unexpected events {other:?}"),
        }
        assert_eq!(order(&engine, "a"), ["y"]);
        assert_eq!(order(&engine, "c"), ["x"]);
        assert!(!engine.was_reverted(&"x".into()));
    }

    #[test]
    fn test_queued_move_back_to_origin_is_local_after_revert() {
        let mut engine = engine();
        let (first, _) = engine
            .request(MoveRequest::new("x", "a", 0, "b", 0))
            .unwrap();
        // Drag it back to where it came from
        engine
            .request(MoveRequest::new("x", "b", 0, "a", 1))
            .unwrap();

        let step = engine.resolve(first, &"x".into(), Err(failure()));

        // After the revert x is already in a: nothing left to confirm
        assert!(step.call.is_none());
        assert!(matches!(step.events.last(), Some(BoardEvent::Committed { .. })));
        assert_eq!(order(&engine, "a"), ["y", "x"]);
        assert!(!engine.is_pending(&"x".into()));
    }

    #[test]
    fn test_refresh_discards_pending_and_ignores_late_outcome() {
        let mut engine = engine();
        let (first, _) = engine
            .request(MoveRequest::new("x", "a", 0, "b", 0))
            .unwrap();
        engine
            .request(MoveRequest::new("x", "b", 0, "c", 0))
            .unwrap();

        let (summary, step) = engine
            .replace_all(vec![
                Deal::new("X", "a").with_id("x"),
                Deal::new("Z", "b").with_id("z"),
            ])
            .unwrap();
        assert_eq!(summary.loaded, 2);
        assert!(matches!(
            step.events[..],
            [BoardEvent::Refreshed { discarded: 2, .. }]
        ));

        let after_refresh = engine.board().snapshot();
        let step = engine.resolve(first, &"x".into(), Err(failure()));

        assert!(step.events.is_empty());
        assert!(step.call.is_none());
        assert_eq!(engine.board().snapshot(), after_refresh);
        assert!(!engine.was_reverted(&"x".into()));
    }

    #[test]
    fn test_outcome_for_older_move_is_ignored() {
        let mut engine = engine();
        let (first, _) = engine
            .request(MoveRequest::new("x", "a", 0, "b", 0))
            .unwrap();
        let x_now = engine.board().deal(&"x".into()).cloned().unwrap();
        engine.replace_all(vec![x_now]).unwrap();
        let (second, _) = engine
            .request(MoveRequest::new("x", "b", 0, "c", 0))
            .unwrap();

        let step = engine.resolve(first, &"x".into(), Err(failure()));
        assert!(step.events.is_empty());
        assert_eq!(engine.pending(&"x".into()).unwrap().id, second);
    }

    #[test]
    fn test_independent_deals_resolve_independently() {
        let mut engine = engine();
        let (mx, _) = engine
            .request(MoveRequest::new("x", "a", 0, "c", 0))
            .unwrap();
        let (mz, step) = engine
            .request(MoveRequest::new("z", "b", 0, "c", 1))
            .unwrap();
        assert!(step.call.is_some());
        assert_eq!(engine.in_flight_count(), 2);

        engine.resolve(mz, &"z".into(), Ok(()));
        engine.resolve(mx, &"x".into(), Err(failure()));

        assert_eq!(order(&engine, "a"), ["x", "y"]);
        assert_eq!(order(&engine, "c"), ["z"]);
        engine.board().verify().unwrap();
    }

    #[test]
    fn test_acknowledge_revert() {
        let mut engine = engine();
        let (id, _) = engine
            .request(MoveRequest::new("x", "a", 0, "b", 0))
            .unwrap();
        engine.resolve(id, &"x".into(), Err(failure()));

        assert!(engine.acknowledge_revert(&"x".into()));
        assert!(!engine.was_reverted(&"x".into()));
        assert!(!engine.acknowledge_revert(&"x".into()));
    }
}
