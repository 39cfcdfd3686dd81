//! Proposal data model.
//!
//! A [`Proposal`] is a value: workflow operations clone it, apply a change and
//! hand the new version to the store. Quorum, threshold and review length are
//! derived from [`Impact`] once, at creation.

use crate::core::error::CharterError;
use crate::plugins::comments::Comment;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

// --- Enumerations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProposalType {
    #[default]
    Constitutional,
    FrameworkSpec,
    GovernanceProcess,
    EnforcementRule,
}

impl ProposalType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProposalType::Constitutional => "constitutional",
            ProposalType::FrameworkSpec => "framework-spec",
            ProposalType::GovernanceProcess => "governance-process",
            ProposalType::EnforcementRule => "enforcement-rule",
        }
    }
}

impl FromStr for ProposalType {
    type Err = CharterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constitutional" => Ok(ProposalType::Constitutional),
            "framework-spec" => Ok(ProposalType::FrameworkSpec),
            "governance-process" => Ok(ProposalType::GovernanceProcess),
            "enforcement-rule" => Ok(ProposalType::EnforcementRule),
            other => Err(CharterError::ValidationError(format!(
                "Unknown proposal type '{}'. Valid: constitutional, framework-spec, governance-process, enforcement-rule",
                other
            ))),
        }
    }
}

/// Severity class. Declaration order is severity order (patch < minor < major < breaking).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum Impact {
    Patch,
    #[default]
    Minor,
    Major,
    Breaking,
}

/// Durations and vote requirements attached to an impact class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactPolicy {
    pub review_days: i64,
    pub voting_days: i64,
    pub quorum: u32,
    /// Minimum approval percentage, 0-100.
    pub threshold: f64,
}

impl Default for ImpactPolicy {
    fn default() -> Self {
        Impact::Minor.policy()
    }
}

impl Impact {
    pub const ALL: [Impact; 4] = [Impact::Patch, Impact::Minor, Impact::Major, Impact::Breaking];

    pub fn policy(self) -> ImpactPolicy {
        match self {
            Impact::Breaking => ImpactPolicy {
                review_days: 21,
                voting_days: 14,
                quorum: 10,
                threshold: 75.0,
            },
            Impact::Major => ImpactPolicy {
                review_days: 14,
                voting_days: 7,
                quorum: 7,
                threshold: 66.0,
            },
            Impact::Minor => ImpactPolicy {
                review_days: 7,
                voting_days: 5,
                quorum: 5,
                threshold: 60.0,
            },
            Impact::Patch => ImpactPolicy {
                review_days: 3,
                voting_days: 3,
                quorum: 3,
                threshold: 50.0,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Impact::Breaking => "breaking",
            Impact::Major => "major",
            Impact::Minor => "minor",
            Impact::Patch => "patch",
        }
    }
}

impl FromStr for Impact {
    type Err = CharterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breaking" => Ok(Impact::Breaking),
            "major" => Ok(Impact::Major),
            "minor" => Ok(Impact::Minor),
            "patch" => Ok(Impact::Patch),
            other => Err(CharterError::ValidationError(format!(
                "Unknown impact '{}'. Valid: breaking, major, minor, patch",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProposalStatus {
    Draft,
    Proposed,
    UnderReview,
    Voting,
    Approved,
    Rejected,
    Implemented,
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 7] = [
        ProposalStatus::Draft,
        ProposalStatus::Proposed,
        ProposalStatus::UnderReview,
        ProposalStatus::Voting,
        ProposalStatus::Approved,
        ProposalStatus::Rejected,
        ProposalStatus::Implemented,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProposalStatus::Draft => "draft",
            ProposalStatus::Proposed => "proposed",
            ProposalStatus::UnderReview => "under-review",
            ProposalStatus::Voting => "voting",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Implemented => "implemented",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProposalStatus::Rejected | ProposalStatus::Implemented)
    }

    /// Edges of the lifecycle graph. No edge skips a state or points backwards.
    pub fn can_advance_to(self, next: ProposalStatus) -> bool {
        use ProposalStatus::*;
        matches!(
            (self, next),
            (Draft, UnderReview)
                | (Proposed, UnderReview)
                | (UnderReview, Voting)
                | (Voting, Approved)
                | (Voting, Rejected)
                | (Approved, Implemented)
        )
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ProposalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = CharterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProposalStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| CharterError::ValidationError(format!("Unknown status '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDecision {
    Approve,
    Reject,
    Abstain,
}

impl FromStr for VoteDecision {
    type Err = CharterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(VoteDecision::Approve),
            "reject" => Ok(VoteDecision::Reject),
            "abstain" => Ok(VoteDecision::Abstain),
            other => Err(CharterError::ValidationError(format!(
                "Unknown decision '{}'. Valid: approve, reject, abstain",
                other
            ))),
        }
    }
}

// --- Records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: String,
    pub decision: VoteDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPeriod {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingConfig {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub votes: Vec<Vote>,
    pub quorum: u32,
    pub threshold: f64,
}

impl VotingConfig {
    pub fn vote_of(&self, voter: &str) -> Option<&Vote> {
        self.votes.iter().find(|v| v.voter == voter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub number: u32,
    pub author: String,
    pub reason: String,
    pub previous_text: String,
    pub proposed_text: String,
    /// SHA-256 of `proposed_text`, hex.
    pub digest: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProposalMetadata {
    pub related_articles: Vec<String>,
    pub affected_files: Vec<String>,
    pub requires_testing: bool,
    pub precedents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: ProposalStatus,
    pub to: ProposalStatus,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub title: String,
    pub description: String,
    pub proposer: String,
    #[serde(rename = "type")]
    pub kind: ProposalType,
    pub impact: Impact,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_text: Option<String>,
    pub proposed_text: String,
    pub rationale: String,
    pub implementation_plan: Vec<String>,
    pub migration_guide: Vec<String>,
    pub status: ProposalStatus,
    pub review_period: ReviewPeriod,
    pub voting: VotingConfig,
    pub comments: Vec<Comment>,
    pub revisions: Vec<Revision>,
    pub supporters: Vec<String>,
    pub metadata: ProposalMetadata,
    pub transitions: Vec<StatusTransition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new proposal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalDraft {
    pub title: String,
    pub description: String,
    pub proposer: String,
    pub kind: ProposalType,
    pub impact: Impact,
    pub current_text: Option<String>,
    pub proposed_text: String,
    pub rationale: String,
    pub implementation_plan: Vec<String>,
    pub migration_guide: Vec<String>,
    pub metadata: ProposalMetadata,
}

/// Lowercase, non-alphanumerics collapsed to single dashes.
pub fn slugify(title: &str) -> String {
    static NON_SLUG: OnceLock<Regex> = OnceLock::new();
    let re = NON_SLUG.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));
    let lowered = title.to_lowercase();
    let slug = re.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "proposal".to_string()
    } else {
        slug.to_string()
    }
}

pub fn proposal_id(title: &str, at: &DateTime<Utc>) -> String {
    format!("{}-{}", slugify(title), at.timestamp_millis())
}

pub fn text_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl Proposal {
    /// Build a fresh `draft` from caller input. Review dates are provisional until submission.
    pub fn from_draft(draft: ProposalDraft, framework_version: &str, now: DateTime<Utc>) -> Self {
        let policy = draft.impact.policy();
        Self {
            id: proposal_id(&draft.title, &now),
            title: draft.title,
            description: draft.description,
            proposer: draft.proposer,
            kind: draft.kind,
            impact: draft.impact,
            version: framework_version.to_string(),
            current_text: draft.current_text,
            proposed_text: draft.proposed_text,
            rationale: draft.rationale,
            implementation_plan: draft.implementation_plan,
            migration_guide: draft.migration_guide,
            status: ProposalStatus::Draft,
            review_period: ReviewPeriod {
                start_date: now,
                end_date: now + Duration::days(policy.review_days),
                duration_days: policy.review_days,
            },
            voting: VotingConfig {
                start_date: None,
                end_date: None,
                votes: Vec::new(),
                quorum: policy.quorum,
                threshold: policy.threshold,
            },
            comments: Vec::new(),
            revisions: Vec::new(),
            supporters: Vec::new(),
            metadata: draft.metadata,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Required-for-review fields that are blank, in declaration order.
    pub fn missing_required_fields(&self) -> Vec<String> {
        [
            ("title", &self.title),
            ("description", &self.description),
            ("proposed_text", &self.proposed_text),
            ("rationale", &self.rationale),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.to_string())
        .collect()
    }

    /// Move along one lifecycle edge, recording it in `transitions`.
    pub fn advance(&mut self, to: ProposalStatus, at: DateTime<Utc>) -> Result<(), CharterError> {
        if !self.status.can_advance_to(to) {
            return Err(CharterError::InvalidStateTransition {
                id: self.id.clone(),
                operation: format!("move to {}", to),
                expected: vec![to.as_str().to_string()],
                actual: self.status.to_string(),
            });
        }
        self.transitions.push(StatusTransition {
            from: self.status,
            to,
            at,
        });
        self.status = to;
        self.updated_at = at;
        Ok(())
    }

    /// Guard: current status must be one of `allowed`.
    pub fn require_status(
        &self,
        operation: &str,
        allowed: &[ProposalStatus],
    ) -> Result<(), CharterError> {
        if allowed.contains(&self.status) {
            return Ok(());
        }
        Err(CharterError::InvalidStateTransition {
            id: self.id.clone(),
            operation: operation.to_string(),
            expected: allowed.iter().map(|s| s.as_str().to_string()).collect(),
            actual: self.status.to_string(),
        })
    }

    /// Guard: rejected and implemented proposals take no further input.
    pub fn require_open(&self, operation: &str) -> Result<(), CharterError> {
        if !self.status.is_terminal() {
            return Ok(());
        }
        Err(CharterError::InvalidStateTransition {
            id: self.id.clone(),
            operation: operation.to_string(),
            expected: ProposalStatus::ALL
                .iter()
                .filter(|s| !s.is_terminal())
                .map(|s| s.as_str().to_string())
                .collect(),
            actual: self.status.to_string(),
        })
    }
}

// --- Filtering ---

#[derive(Debug, Clone, Default)]
pub struct ProposalFilter {
    pub status: Option<ProposalStatus>,
    pub impact: Option<Impact>,
    pub kind: Option<ProposalType>,
    pub proposer: Option<String>,
}

impl ProposalFilter {
    pub fn matches(&self, proposal: &Proposal) -> bool {
        self.status.is_none_or(|s| proposal.status == s)
            && self.impact.is_none_or(|i| proposal.impact == i)
            && self.kind.is_none_or(|k| proposal.kind == k)
            && self
                .proposer
                .as_deref()
                .is_none_or(|p| proposal.proposer == p)
    }
}
