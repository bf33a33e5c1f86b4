//! Core types for the pipeline engine

mod deal;
mod ids;
mod position;
mod record;
mod request;
mod stage;

// Re-export all types
pub use deal::{Deal, Priority};
pub use ids::{DealId, MoveId, StageId};
pub use position::{clamp_insert_index, max_destination_index, Position};
pub use record::{MoveRecord, MoveStatus};
pub use request::{DragLocation, DropResult, MoveRequest};
pub use stage::{StageDef, StageList};
