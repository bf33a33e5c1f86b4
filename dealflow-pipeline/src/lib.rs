//! Deal pipeline engine with optimistic stage transitions
//!
//! This crate keeps the client-side state of a CRM deal board: an ordered
//! sequence of stages, each holding an ordered list of deals. Moving a deal
//! between stages is applied to the board immediately, sent to a remote
//! store, and reverted if the store refuses it.
//!
//! ## Overview
//!
//! - **Optimistic** - a valid move is visible before the remote call starts
//! - **Per-deal reconciliation** - a failed move puts back only its own deal
//! - **Serialized per deal** - at most one unconfirmed move per deal; later
//!   moves queue behind it
//! - **Stage is durable, order is not** - the remote store only learns a
//!   deal's stage; position within a stage is a client-side concern
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use dealflow_pipeline::{MoveRequest, Pipeline, PipelineConfig, PipelineRemote};
//!
//! # async fn example(remote: impl PipelineRemote + 'static) -> dealflow_pipeline::Result<()> {
//! let config = PipelineConfig::load(".")?;
//! let pipeline = Pipeline::new(&config, remote)?;
//! let mut events = pipeline.subscribe();
//!
//! pipeline.load().await?;
//!
//! // Drag the first prospect to the top of qualification
//! let move_id = pipeline
//!     .submit(MoveRequest::new("deal-1", "prospect", 0, "qualification", 0))
//!     .await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if event.is_terminal() && event.move_id() == Some(move_id) {
//!         println!("{event:?}");
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The synchronous core is [`TransitionEngine`]; [`Pipeline`] drives it on a
//! tokio runtime and publishes [`BoardEvent`]s.

pub mod board;
pub mod config;
pub mod defaults;
pub mod engine;
mod error;
pub mod events;
pub mod pipeline;
pub mod reconcile;
pub mod remote;
pub mod types;
pub mod view;

#[cfg(feature = "test-support")]
pub mod test_support;

pub use board::{BoardSnapshot, BoardState, LoadSummary};
pub use config::PipelineConfig;
pub use defaults::default_stages;
pub use engine::{StageUpdate, Step, TransitionEngine};
pub use error::{InvalidMoveReason, PipelineError, RemoteError, Result};
pub use events::BoardEvent;
pub use pipeline::Pipeline;
pub use remote::PipelineRemote;
pub use view::{BoardView, DealCard, StageMetrics, StageView};

// Re-export commonly used types
pub use types::{
    Deal, DealId, DragLocation, DropResult, MoveId, MoveRecord, MoveRequest, MoveStatus, Position,
    Priority, StageDef, StageId, StageList,
};
