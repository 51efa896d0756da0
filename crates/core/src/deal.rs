//! Best-deal decision.

use crate::PriceObservation;
use serde::{Deserialize, Serialize};

/// Outcome of evaluating one stored observation against its window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DealDecision {
    /// The observation is the current minimum for its product.
    Alert(PriceObservation),
    NoAlert,
}

impl DealDecision {
    pub fn is_alert(&self) -> bool {
        matches!(self, DealDecision::Alert(_))
    }

    /// The alerted observation, if any.
    pub fn observation(&self) -> Option<&PriceObservation> {
        match self {
            DealDecision::Alert(obs) => Some(obs),
            DealDecision::NoAlert => None,
        }
    }
}
