//! Weighted vote tally.
//!
//! Approvals, rejections and abstentions are summed by weight. The approval
//! percentage divides by all three, so abstentions lower it. Quorum counts raw
//! votes, not weight.

use crate::plugins::proposal::{Vote, VoteDecision};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingResult {
    pub total_votes: u32,
    pub approvals: u32,
    pub rejections: u32,
    pub abstentions: u32,
    pub total_weight: u32,
    pub approval_percentage: f64,
    pub quorum: u32,
    pub threshold: f64,
    pub quorum_met: bool,
    pub passed: bool,
    pub summary: String,
}

pub fn tally(votes: &[Vote], quorum: u32, threshold: f64) -> VotingResult {
    let mut approvals = 0u32;
    let mut rejections = 0u32;
    let mut abstentions = 0u32;
    for vote in votes {
        match vote.decision {
            VoteDecision::Approve => approvals += vote.weight,
            VoteDecision::Reject => rejections += vote.weight,
            VoteDecision::Abstain => abstentions += vote.weight,
        }
    }

    let total_weight = approvals + rejections + abstentions;
    let approval_percentage = if total_weight > 0 {
        f64::from(approvals) / f64::from(total_weight) * 100.0
    } else {
        0.0
    };
    let total_votes = votes.len() as u32;
    let quorum_met = total_votes >= quorum;
    let passed = quorum_met && approval_percentage >= threshold;

    let summary = format!(
        "{}: {} votes ({}/{} quorum{}), {:.1}% weighted approval vs {:.0}% threshold [approve {}, reject {}, abstain {}]",
        if passed { "PASSED" } else { "FAILED" },
        total_votes,
        total_votes,
        quorum,
        if quorum_met { "" } else { " not met" },
        approval_percentage,
        threshold,
        approvals,
        rejections,
        abstentions,
    );

    VotingResult {
        total_votes,
        approvals,
        rejections,
        abstentions,
        total_weight,
        approval_percentage,
        quorum,
        threshold,
        quorum_met,
        passed,
        summary,
    }
}
