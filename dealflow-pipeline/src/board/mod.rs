//! Board state: the single source of truth for stage membership and order

mod snapshot;
mod state;

pub use snapshot::BoardSnapshot;
pub use state::{BoardState, LoadSummary};
