//! Deal: the card moved across the pipeline

use super::ids::{DealId, StageId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Commercial priority of a deal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// A deal on the pipeline board.
///
/// The engine reads `id` and writes `stage`; every other field is passed
/// through untouched. Field names follow the CRM API (camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: DealId,
    /// Stage currently holding the deal. Always equals the key of the stage
    /// list that contains it once the board is settled.
    pub stage: StageId,
    pub name: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_close: Option<NaiveDate>,
    /// Win probability in percent (0..=100)
    #[serde(default)]
    pub probability: u8,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub notes: String,
}

impl Deal {
    /// Create a new deal in the given stage
    pub fn new(name: impl Into<String>, stage: impl Into<StageId>) -> Self {
        Self {
            id: DealId::new(),
            stage: stage.into(),
            name: name.into(),
            value: 0.0,
            client_id: None,
            expected_close: None,
            probability: 0,
            priority: Priority::default(),
            notes: String::new(),
        }
    }

    /// Use an explicit id instead of a generated one
    pub fn with_id(mut self, id: impl Into<DealId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the deal value
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Set the win probability, capped at 100
    pub fn with_probability(mut self, probability: u8) -> Self {
        self.probability = probability.min(100);
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Value weighted by win probability
    pub fn weighted_value(&self) -> f64 {
        self.value * f64::from(self.probability.min(100)) / 100.0
    }
}
