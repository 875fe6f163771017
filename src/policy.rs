use serde::{Deserialize, Serialize};

/// Outcome of comparing a freshly extracted price against stored state.
/// Exactly one decision is produced per successful check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertDecision {
    None,
    PriceDrop,
    PriceRise,
    TargetReached,
}

impl AlertDecision {
    pub fn warrants_notification(&self) -> bool {
        !matches!(self, AlertDecision::None)
    }
}

/// Change-detection policy. A user-set target price always wins over the
/// relative-change threshold; the first successful check only establishes a
/// baseline.
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    threshold_percent: f64,
}

impl AlertPolicy {
    pub fn new(threshold_percent: f64) -> Self {
        Self { threshold_percent }
    }

    pub fn threshold_percent(&self) -> f64 {
        self.threshold_percent
    }

    pub fn evaluate(
        &self,
        old_price: Option<f64>,
        new_price: f64,
        target_price: Option<f64>,
    ) -> AlertDecision {
        let Some(old_price) = old_price else {
            return AlertDecision::None;
        };

        if let Some(target) = target_price {
            if new_price <= target {
                return AlertDecision::TargetReached;
            }
        }

        if old_price <= 0.0 || new_price == old_price {
            return AlertDecision::None;
        }

        let change_percent = (new_price - old_price) / old_price * 100.0;
        if change_percent.abs() >= self.threshold_percent {
            if change_percent < 0.0 {
                AlertDecision::PriceDrop
            } else {
                AlertDecision::PriceRise
            }
        } else {
            AlertDecision::None
        }
    }
}
