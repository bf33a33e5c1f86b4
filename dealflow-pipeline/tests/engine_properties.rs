//! Property-based tests for the transition engine
//!
//! Random sequences of moves and remote outcomes are driven through the
//! synchronous engine; board membership must stay consistent throughout.

use dealflow_pipeline::types::max_destination_index;
use dealflow_pipeline::{
    BoardState, Deal, DealId, MoveRequest, StageDef, StageId, TransitionEngine,
};
use proptest::prelude::*;

const STAGES: usize = 4;
const DEALS: usize = 6;

#[derive(Debug, Clone)]
enum Op {
    Move {
        deal: usize,
        to_stage: usize,
        to_index: usize,
    },
    Resolve {
        deal: usize,
        ok: bool,
    },
    StaleSource {
        deal: usize,
    },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..DEALS, 0..STAGES, 0..8usize).prop_map(|(deal, to_stage, to_index)| Op::Move {
            deal,
            to_stage,
            to_index,
        }),
        3 => (0..DEALS, any::<bool>()).prop_map(|(deal, ok)| Op::Resolve { deal, ok }),
        1 => (0..DEALS).prop_map(|deal| Op::StaleSource { deal }),
    ]
}

fn stage_id(i: usize) -> StageId {
    StageId::from(format!("s{i}"))
}

fn deal_id(i: usize) -> DealId {
    DealId::from(format!("d{i}"))
}

fn engine() -> TransitionEngine {
    let stages: Vec<StageDef> = (0..STAGES)
        .map(|i| StageDef::new(stage_id(i), format!("Stage {i}")))
        .collect();
    let deals = (0..DEALS).map(|i| Deal::new(format!("Deal {i}"), stage_id(i % STAGES)).with_id(deal_id(i)));
    TransitionEngine::with_board(BoardState::from_deals(&stages, deals).unwrap())
}

fn run(engine: &mut TransitionEngine, op: &Op) -> Result<(), TestCaseError> {
    match *op {
        Op::Move {
            deal,
            to_stage,
            to_index,
        } => {
            let id = deal_id(deal);
            let from = engine.board().locate(&id).unwrap();
            let to = stage_id(to_stage);
            let len = engine.board().stage(&to).unwrap().len();
            let max = max_destination_index(len, from.stage == to);
            let request = MoveRequest::new(id, from.stage, from.index, to, to_index % (max + 1));
            prop_assert!(engine.request(request).is_ok());
        }
        Op::Resolve { deal, ok } => {
            let id = deal_id(deal);
            let Some(record) = engine.pending(&id).cloned() else {
                return Ok(());
            };
            let queued = engine.queued_count(&id);
            let before = engine.board().snapshot();
            // In-flight moves always cross stages, so the deal is not in here
            let previous_len = engine.board().stage(&record.previous.stage).unwrap().len();
            let outcome = if ok {
                Ok(())
            } else {
                Err(dealflow_pipeline::RemoteError::network("offline"))
            };

            engine.resolve(record.id, &id, outcome);

            if queued == 0 {
                if ok {
                    prop_assert_eq!(engine.board().snapshot(), before);
                } else {
                    let now = engine.board().locate(&id).unwrap();
                    prop_assert_eq!(&now.stage, &record.previous.stage);
                    prop_assert_eq!(now.index, record.previous.index.min(previous_len));
                    prop_assert!(engine.was_reverted(&id));
                }
            }

            // A second outcome for the same move changes nothing
            let settled = engine.board().snapshot();
            let in_flight = engine.in_flight_count();
            let step = engine.resolve(record.id, &id, Ok(()));
            prop_assert!(step.events.is_empty());
            prop_assert!(step.call.is_none());
            prop_assert_eq!(engine.board().snapshot(), settled);
            prop_assert_eq!(engine.in_flight_count(), in_flight);
        }
        Op::StaleSource { deal } => {
            let id = deal_id(deal);
            let from = engine.board().locate(&id).unwrap();
            let before = engine.board().snapshot();
            let in_flight = engine.in_flight_count();
            let request = MoveRequest::new(id, from.stage, from.index + 1, stage_id(0), 0);

            let err = engine.request(request).unwrap_err();
            prop_assert!(err.is_invalid_move());
            prop_assert_eq!(engine.board().snapshot(), before);
            prop_assert_eq!(engine.in_flight_count(), in_flight);
        }
    }
    Ok(())
}

proptest! {
    /// Property: every deal sits in exactly one stage, and that stage matches
    /// the deal's own stage field, after any sequence of moves and outcomes.
    #[test]
    fn test_membership_holds_under_random_moves(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut engine = engine();

        for op in &ops {
            run(&mut engine, op)?;
            prop_assert!(engine.board().verify().is_ok(), "board broken after {:?}", op);
            prop_assert_eq!(engine.board().len(), DEALS);
        }

        // Drain whatever is still outstanding
        for _ in 0..ops.len() + DEALS {
            for deal in 0..DEALS {
                run(&mut engine, &Op::Resolve { deal, ok: true })?;
            }
            if engine.in_flight_count() == 0 {
                break;
            }
        }
        prop_assert_eq!(engine.in_flight_count(), 0);
        prop_assert!(engine.board().verify().is_ok());
    }

    /// Property: committing every move leaves each deal in the stage of its
    /// last requested move.
    #[test]
    fn test_commits_keep_last_requested_stage(
        moves in prop::collection::vec((0..DEALS, 0..STAGES, 0..8usize), 1..30)
    ) {
        let mut engine = engine();
        let mut expected: Vec<StageId> = (0..DEALS).map(|i| stage_id(i % STAGES)).collect();

        for &(deal, to_stage, to_index) in &moves {
            run(&mut engine, &Op::Move { deal, to_stage, to_index })?;
            expected[deal] = stage_id(to_stage);
        }
        for _ in 0..moves.len() {
            for deal in 0..DEALS {
                run(&mut engine, &Op::Resolve { deal, ok: true })?;
            }
        }

        prop_assert_eq!(engine.in_flight_count(), 0);
        for (i, stage) in expected.iter().enumerate() {
            prop_assert_eq!(&engine.board().deal(&deal_id(i)).unwrap().stage, stage);
        }
    }
}
