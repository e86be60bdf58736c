// SPDX-License-Identifier: MIT

//! Refund approval policy

/// Refunds at or above this amount need a human sign-off
pub const DEFAULT_APPROVAL_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefundPolicy {
    pub approval_threshold: f64,
}

impl RefundPolicy {
    pub fn new(approval_threshold: f64) -> Self {
        Self { approval_threshold }
    }

    /// Whether a refund of `refund_amount` must be approved by a human
    pub fn evaluate(&self, refund_amount: f64) -> bool {
        refund_amount >= self.approval_threshold
    }
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_APPROVAL_THRESHOLD)
    }
}
