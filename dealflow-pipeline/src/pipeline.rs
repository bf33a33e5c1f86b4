//! Async driver tying the engine to a remote store.
//!
//! `Pipeline` is what a board UI holds on to. Submitting a move validates it
//! and applies it before `submit` returns; the stage update is then sent on a
//! spawned task and its outcome fed back to the engine. Board changes are
//! announced on a broadcast channel.

use crate::board::{BoardSnapshot, LoadSummary};
use crate::config::PipelineConfig;
use crate::engine::{StageUpdate, Step, TransitionEngine};
use crate::error::{RemoteError, Result};
use crate::events::BoardEvent;
use crate::remote::PipelineRemote;
use crate::types::{DealId, DropResult, MoveId, MoveRequest};
use crate::view::BoardView;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

/// A live pipeline board bound to a remote store
pub struct Pipeline<R> {
    engine: Arc<Mutex<TransitionEngine>>,
    remote: Arc<R>,
    events: broadcast::Sender<BoardEvent>,
    remote_timeout: Option<Duration>,
}

impl<R> Clone for Pipeline<R> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            remote: Arc::clone(&self.remote),
            events: self.events.clone(),
            remote_timeout: self.remote_timeout,
        }
    }
}

impl<R: PipelineRemote + 'static> Pipeline<R> {
    /// Create a pipeline with an empty board. Call [`Pipeline::load`] to
    /// populate it.
    ///
    /// The configuration is validated first, so hand-built configs get the
    /// same checks as loaded ones.
    pub fn new(config: &PipelineConfig, remote: R) -> Result<Self> {
        Self::with_shared_remote(config, Arc::new(remote))
    }

    /// Create a pipeline around a remote the caller keeps a handle to
    pub fn with_shared_remote(config: &PipelineConfig, remote: Arc<R>) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(config.event_capacity);
        Ok(Self {
            engine: Arc::new(Mutex::new(TransitionEngine::new(&config.stages))),
            remote,
            events,
            remote_timeout: config.remote_timeout(),
        })
    }

    /// Subscribe to board events
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    /// Replace the board with the remote store's current deals.
    ///
    /// Supersedes every unconfirmed move. On failure the board is left as it
    /// was.
    pub async fn load(&self) -> Result<LoadSummary> {
        let deals = match self.remote.load_deals().await {
            Ok(deals) => deals,
            Err(err) => {
                warn!(error = %err, "failed to load deals");
                return Err(err.into());
            }
        };

        let mut engine = self.engine.lock().await;
        let (summary, step) = engine.replace_all(deals)?;
        self.publish(step.events);
        Ok(summary)
    }

    /// Apply a move now and confirm it with the remote store in the
    /// background.
    ///
    /// Invalid requests fail here, with no change to the board and no remote
    /// call.
    pub async fn submit(&self, request: MoveRequest) -> Result<MoveId> {
        let mut engine = self.engine.lock().await;
        let (move_id, step) = engine.request(request)?;
        self.publish(step.events);
        drop(engine);

        if let Some(call) = step.call {
            let this = self.clone();
            tokio::spawn(async move { this.confirm(call).await });
        }
        Ok(move_id)
    }

    /// Submit the move described by a drop. Drops outside any stage are
    /// ignored.
    pub async fn submit_drop(&self, drop: &DropResult) -> Result<Option<MoveId>> {
        match MoveRequest::from_drop(drop) {
            Some(request) => self.submit(request).await.map(Some),
            None => {
                debug!(deal = %drop.draggable_id, "drop outside the board ignored");
                Ok(None)
            }
        }
    }

    /// Current board for rendering
    pub async fn view(&self) -> BoardView {
        self.engine.lock().await.view()
    }

    /// Value copy of the current board
    pub async fn snapshot(&self) -> BoardSnapshot {
        self.engine.lock().await.board().snapshot()
    }

    /// Number of deals waiting for a remote confirmation
    pub async fn in_flight(&self) -> usize {
        self.engine.lock().await.in_flight_count()
    }

    /// Clear a deal's reverted marker once the UI has shown it
    pub async fn acknowledge_revert(&self, deal: &DealId) -> bool {
        self.engine.lock().await.acknowledge_revert(deal)
    }

    /// Send stage updates for one deal until its queue is drained
    async fn confirm(&self, mut call: StageUpdate) {
        loop {
            let outcome = self.send(&call).await;
            let next = {
                let mut engine = self.engine.lock().await;
                let Step { events, call: queued } =
                    engine.resolve(call.move_id, &call.deal_id, outcome);
                self.publish(events);
                queued
            };
            match next {
                Some(next) => call = next,
                None => break,
            }
        }
    }

    async fn send(&self, call: &StageUpdate) -> std::result::Result<(), RemoteError> {
        debug!(deal = %call.deal_id, stage = %call.stage, move_id = %call.move_id, "sending stage update");
        let update = self.remote.update_stage(&call.deal_id, &call.stage);
        match self.remote_timeout {
            Some(limit) => tokio::time::timeout(limit, update)
                .await
                .unwrap_or_else(|_| {
                    Err(RemoteError::Timeout {
                        elapsed_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    })
                }),
            None => update.await,
        }
    }

    /// Send events to subscribers. Callers hold the engine lock so events
    /// leave in the order the engine produced them.
    fn publish(&self, events: Vec<BoardEvent>) {
        for event in events {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }
}
