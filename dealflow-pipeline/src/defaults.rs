//! Built-in pipeline definition.
//!
//! `default_stages()` is the stage sequence used when no configuration file
//! overrides it: the classic five-step sales pipeline.

use crate::types::StageDef;

/// Capacity of the board event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// The built-in stage sequence, in pipeline order
pub fn default_stages() -> Vec<StageDef> {
    vec![
        StageDef::new("prospect", "Prospects"),
        StageDef::new("qualification", "Qualification"),
        StageDef::new("proposition", "Proposition"),
        StageDef::new("negociation", "Négociation"),
        StageDef::new("cloture", "Clôture"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stage_order() {
        let ids: Vec<_> = default_stages()
            .into_iter()
            .map(|s| s.id.to_string())
            .collect();
        assert_eq!(
            ids,
            ["prospect", "qualification", "proposition", "negociation", "cloture"]
        );
    }
}
