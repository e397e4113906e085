//! Operator decisions.
//!
//! The controller never reads the terminal directly; every question goes
//! through an [`Operator`], so tests can script the answers.

use crate::error::Result;

/// Answer at the publish gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateChoice {
    /// Accept the candidate and publish it
    Publish,
    /// Reject the candidate
    Fail,
    /// Show changes since the previous release, then ask again
    Diff,
}

/// Source of operator decisions
pub trait Operator {
    /// Version to release; an empty answer takes `suggested`
    fn choose_version(&self, current: &str, suggested: Option<&str>) -> Result<String>;

    /// Publish, fail or diff the candidate; `Diff` is only valid when offered
    fn choose_gate(&self, version: &str, offer_diff: bool) -> Result<GateChoice>;

    /// Yes/no question
    fn confirm(&self, question: &str) -> Result<bool>;
}
