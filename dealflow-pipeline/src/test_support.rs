//! Test helpers: a scriptable in-memory remote store.
//!
//! Only compiled with the `test-support` feature.

use crate::error::RemoteError;
use crate::events::BoardEvent;
use crate::remote::PipelineRemote;
use crate::types::{Deal, DealId, MoveId, StageId};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::{broadcast, oneshot, Mutex, Notify};

struct HeldCall {
    deal: DealId,
    reply: oneshot::Sender<Result<(), RemoteError>>,
}

#[derive(Default)]
struct ScriptState {
    deals: Vec<Deal>,
    hold: bool,
    held: VecDeque<HeldCall>,
    failures: HashMap<DealId, VecDeque<RemoteError>>,
    load_failure: Option<RemoteError>,
    calls: Vec<(DealId, StageId)>,
    in_flight: HashMap<DealId, usize>,
    max_in_flight: HashMap<DealId, usize>,
}

/// In-memory [`PipelineRemote`].
///
/// Answers immediately by default. In holding mode every stage update waits
/// until the test calls [`ScriptedRemote::release`]. Successful updates are
/// written to the remote's own deal list, so a later `load_deals` returns
/// what a real server would.
#[derive(Default)]
pub struct ScriptedRemote {
    state: Mutex<ScriptState>,
    call_made: Notify,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a set of deals on the server
    pub fn with_deals(deals: Vec<Deal>) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                deals,
                ..ScriptState::default()
            }),
            call_made: Notify::new(),
        }
    }

    /// Hold every stage update until released
    pub fn holding(mut self) -> Self {
        self.state.get_mut().hold = true;
        self
    }

    /// Make the next update for `deal` fail with `error`
    pub async fn fail_next(&self, deal: impl Into<DealId>, error: RemoteError) {
        self.state
            .lock()
            .await
            .failures
            .entry(deal.into())
            .or_default()
            .push_back(error);
    }

    /// Make the next bulk load fail
    pub async fn fail_load(&self, error: RemoteError) {
        self.state.lock().await.load_failure = Some(error);
    }

    /// Replace the server-side deals
    pub async fn set_deals(&self, deals: Vec<Deal>) {
        self.state.lock().await.deals = deals;
    }

    /// Every stage update received so far, in order
    pub async fn calls(&self) -> Vec<(DealId, StageId)> {
        self.state.lock().await.calls.clone()
    }

    /// Highest number of simultaneous updates seen for one deal
    pub async fn max_in_flight(&self, deal: &DealId) -> usize {
        self.state
            .lock()
            .await
            .max_in_flight
            .get(deal)
            .copied()
            .unwrap_or(0)
    }

    /// Wait until at least `count` stage updates have been received
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let notified = self.call_made.notified();
            if self.state.lock().await.calls.len() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Answer the oldest held update for `deal`. Returns false if none is
    /// waiting.
    pub async fn release(&self, deal: impl Into<DealId>, outcome: Result<(), RemoteError>) -> bool {
        let deal = deal.into();
        let mut state = self.state.lock().await;
        let Some(index) = state.held.iter().position(|c| c.deal == deal) else {
            return false;
        };
        match state.held.remove(index) {
            Some(call) => call.reply.send(outcome).is_ok(),
            None => false,
        }
    }
}

enum Reply {
    Now(Result<(), RemoteError>),
    Later(oneshot::Receiver<Result<(), RemoteError>>),
}

#[async_trait]
impl PipelineRemote for ScriptedRemote {
    async fn update_stage(&self, deal: &DealId, stage: &StageId) -> Result<(), RemoteError> {
        let reply = {
            let mut state = self.state.lock().await;
            state.calls.push((deal.clone(), stage.clone()));
            let running = {
                let count = state.in_flight.entry(deal.clone()).or_default();
                *count += 1;
                *count
            };
            let max = state.max_in_flight.entry(deal.clone()).or_default();
            *max = (*max).max(running);

            if state.hold {
                let (reply, rx) = oneshot::channel();
                state.held.push_back(HeldCall {
                    deal: deal.clone(),
                    reply,
                });
                Reply::Later(rx)
            } else {
                let failure = state.failures.get_mut(deal).and_then(VecDeque::pop_front);
                Reply::Now(failure.map_or(Ok(()), Err))
            }
        };
        self.call_made.notify_waiters();

        let outcome = match reply {
            Reply::Now(outcome) => outcome,
            Reply::Later(rx) => rx
                .await
                .unwrap_or_else(|_| Err(RemoteError::network("held call abandoned"))),
        };

        let mut state = self.state.lock().await;
        if let Some(count) = state.in_flight.get_mut(deal) {
            *count = count.saturating_sub(1);
        }
        if outcome.is_ok() {
            if let Some(stored) = state.deals.iter_mut().find(|d| &d.id == deal) {
                stored.stage = stage.clone();
            }
        }
        outcome
    }

    async fn load_deals(&self) -> Result<Vec<Deal>, RemoteError> {
        let mut state = self.state.lock().await;
        match state.load_failure.take() {
            Some(err) => Err(err),
            None => Ok(state.deals.clone()),
        }
    }
}

/// Wait for the event that ends `move_id`'s lifecycle.
///
/// Returns `None` if the channel closes first.
pub async fn wait_settled(
    events: &mut broadcast::Receiver<BoardEvent>,
    move_id: MoveId,
) -> Option<BoardEvent> {
    loop {
        match events.recv().await {
            Ok(event) if event.is_terminal() && event.move_id() == Some(move_id) => {
                return Some(event)
            }
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
