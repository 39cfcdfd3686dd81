//! The amendment workflow: the proposal lifecycle state machine.
//!
//! ```text
//! draft ─submit─▶ under-review ─start-voting─▶ voting ─finalize─▶ approved ─▶ implemented
//!                                                         └──────▶ rejected
//! ```
//!
//! Every operation loads the current record, checks its guards against a copy,
//! and writes the copy back with a compare-and-swap on the store version. A
//! failed guard never reaches the store. A lost race re-runs the whole
//! load-check-write cycle, so guards such as duplicate-vote prevention always
//! see the latest record.
//!
//! Time gates are evaluated lazily against the injected [`Clock`]; nothing
//! advances a proposal on its own.

use crate::core::config::CharterConfig;
use crate::core::error::CharterError;
use crate::core::store::Store;
use crate::core::time::{self, Clock};
use crate::plugins::comments::{self, Comment, CommentKind, NewComment};
use crate::plugins::notify::{EventLogNotifier, Notifier, WorkflowEvent};
use crate::plugins::proposal::{
    Impact, Proposal, ProposalDraft, ProposalFilter, ProposalMetadata, ProposalStatus,
    ProposalType, Revision, Vote, VoteDecision, text_digest,
};
use crate::plugins::proposal_store::{
    FinalOutcome, HistoryEntry, HistoryLog, ProposalStore, SqliteProposalStore, StoredProposal,
};
use crate::plugins::registry::VoterRegistry;
use crate::plugins::tally::{VotingResult, tally};
use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Attempts at the load-check-write cycle before a conflict is surfaced.
pub const MAX_CAS_ATTEMPTS: usize = 8;

/// A ballot as submitted; weight and timestamp are filled in by the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastVote {
    pub voter: String,
    pub decision: VoteDecision,
    pub rationale: Option<String>,
}

impl CastVote {
    pub fn new(voter: &str, decision: VoteDecision) -> Self {
        Self {
            voter: voter.to_string(),
            decision,
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: &str) -> Self {
        self.rationale = Some(rationale.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Finalization {
    pub proposal: Proposal,
    pub result: FinalOutcome,
    pub voting_result: VotingResult,
}

pub struct AmendmentWorkflow {
    store: Arc<dyn ProposalStore>,
    history: Arc<dyn HistoryLog>,
    registry: Arc<dyn VoterRegistry>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    framework_version: String,
}

impl AmendmentWorkflow {
    pub fn new(
        store: Arc<dyn ProposalStore>,
        history: Arc<dyn HistoryLog>,
        registry: Arc<dyn VoterRegistry>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            history,
            registry,
            clock,
            notifier,
            framework_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_framework_version(mut self, version: &str) -> Self {
        self.framework_version = version.to_string();
        self
    }

    /// Wire a workflow over the SQLite store, config-defined registry and event-log notifier.
    pub fn open(
        store: &Store,
        config: &CharterConfig,
        clock: Arc<dyn Clock>,
        actor: &str,
    ) -> Result<Self, CharterError> {
        let proposals = Arc::new(SqliteProposalStore::open(&store.root)?.with_actor(actor));
        let notifier = Arc::new(EventLogNotifier::new(&store.notify_log_path()));
        Ok(Self::new(
            proposals.clone(),
            proposals,
            Arc::new(config.registry()),
            clock,
            notifier,
        )
        .with_framework_version(&config.framework_version))
    }

    /// Load-check-write with optimistic concurrency. `apply` mutates a private
    /// copy; its error aborts the operation without touching the store.
    fn mutate<T, F>(&self, id: &str, op: &str, apply: F) -> Result<(Proposal, T), CharterError>
    where
        F: FnMut(&mut Proposal, DateTime<Utc>) -> Result<T, CharterError>,
    {
        self.mutate_with(id, op, apply, |next, version, _| self.store.update(next, version))
    }

    /// [`Self::mutate`] with a caller-chosen write step. `write` gets the new
    /// record, the version it was read at, and `apply`'s output; it must be
    /// a single compare-and-swap.
    fn mutate_with<T, F, W>(
        &self,
        id: &str,
        op: &str,
        mut apply: F,
        mut write: W,
    ) -> Result<(Proposal, T), CharterError>
    where
        F: FnMut(&mut Proposal, DateTime<Utc>) -> Result<T, CharterError>,
        W: FnMut(&Proposal, u64, &T) -> Result<u64, CharterError>,
    {
        let mut last_version = 0;
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let StoredProposal { proposal, version } = self.store.get(id)?;
            let now = self.clock.now();
            let mut next = proposal.clone();
            let out = apply(&mut next, now)?;
            if next == proposal {
                tracing::debug!(proposal_id = %id, op, "no change, write skipped");
                return Ok((proposal, out));
            }
            next.updated_at = now;

            match write(&next, version, &out) {
                Ok(_) => return Ok((next, out)),
                Err(CharterError::VersionConflict { .. }) => {
                    tracing::debug!(proposal_id = %id, op, attempt, version, "version conflict, retrying");
                    last_version = version;
                }
                Err(e) => return Err(e),
            }
        }
        Err(CharterError::VersionConflict {
            id: id.to_string(),
            expected: last_version,
        })
    }

    // --- Lifecycle ---

    pub fn create(&self, draft: ProposalDraft) -> Result<Proposal, CharterError> {
        let proposal = Proposal::from_draft(draft, &self.framework_version, self.clock.now());
        self.store.create(&proposal)?;
        tracing::info!(
            proposal_id = %proposal.id,
            impact = %proposal.impact,
            quorum = proposal.voting.quorum,
            threshold = proposal.voting.threshold,
            "proposal created"
        );
        Ok(proposal)
    }

    pub fn submit_for_review(&self, id: &str) -> Result<Proposal, CharterError> {
        let (proposal, ()) = self.mutate(id, "submit", |p, now| {
            p.require_status(
                "submit for review",
                &[ProposalStatus::Draft, ProposalStatus::Proposed],
            )?;
            let missing = p.missing_required_fields();
            if !missing.is_empty() {
                return Err(CharterError::IncompleteProposal {
                    id: p.id.clone(),
                    missing,
                });
            }
            p.review_period.start_date = now;
            p.review_period.end_date = now + Duration::days(p.review_period.duration_days);
            p.advance(ProposalStatus::UnderReview, now)
        })?;

        tracing::info!(
            proposal_id = %proposal.id,
            review_ends = %time::iso(&proposal.review_period.end_date),
            "review started"
        );
        self.notifier.notify(&proposal, WorkflowEvent::ReviewStarted);
        Ok(proposal)
    }

    pub fn start_voting(&self, id: &str) -> Result<Proposal, CharterError> {
        let (proposal, ()) = self.mutate(id, "start-voting", |p, now| {
            p.require_status("start voting on", &[ProposalStatus::UnderReview])?;
            if now < p.review_period.end_date {
                return Err(CharterError::ReviewPeriodNotElapsed {
                    id: p.id.clone(),
                    ends: p.review_period.end_date,
                    now,
                });
            }
            let voting_days = p.impact.policy().voting_days;
            p.voting.start_date = Some(now);
            p.voting.end_date = Some(now + Duration::days(voting_days));
            p.advance(ProposalStatus::Voting, now)
        })?;

        // Open concerns are reported, not enforced.
        let concerns = comments::unresolved_concerns(&proposal.comments);
        if !concerns.is_empty() {
            let ids: Vec<&str> = concerns.iter().map(|c| c.id.as_str()).collect();
            tracing::warn!(
                proposal_id = %proposal.id,
                count = concerns.len(),
                comments = ?ids,
                "voting started with unresolved concerns"
            );
        }
        tracing::info!(proposal_id = %proposal.id, "voting started");
        self.notifier.notify(&proposal, WorkflowEvent::VotingStarted);
        Ok(proposal)
    }

    pub fn cast_vote(&self, id: &str, ballot: CastVote) -> Result<Vote, CharterError> {
        let (_, vote) = self.mutate(id, "vote", |p, now| {
            p.require_status("vote on", &[ProposalStatus::Voting])?;
            let ends = voting_end(p)?;
            if now > ends {
                return Err(CharterError::VotingClosed {
                    id: p.id.clone(),
                    ended: ends,
                    now,
                });
            }
            if !self.registry.is_eligible(&ballot.voter) {
                return Err(CharterError::IneligibleVoter {
                    id: p.id.clone(),
                    voter: ballot.voter.clone(),
                });
            }
            if let Some(existing) = p.voting.vote_of(&ballot.voter) {
                return Err(CharterError::DuplicateVote {
                    id: p.id.clone(),
                    voter: ballot.voter.clone(),
                    cast_at: existing.timestamp,
                });
            }
            let vote = Vote {
                voter: ballot.voter.clone(),
                decision: ballot.decision,
                rationale: ballot.rationale.clone(),
                timestamp: now,
                weight: self.registry.weight_of(&ballot.voter),
            };
            p.voting.votes.push(vote.clone());
            Ok(vote)
        })?;

        tracing::info!(proposal_id = %id, voter = %vote.voter, weight = vote.weight, "vote recorded");
        Ok(vote)
    }

    /// Preview or final count; pure read, any status.
    pub fn tally_votes(&self, id: &str) -> Result<VotingResult, CharterError> {
        let proposal = self.store.get(id)?.proposal;
        Ok(tally(
            &proposal.voting.votes,
            proposal.voting.quorum,
            proposal.voting.threshold,
        ))
    }

    /// Close voting. The terminal status and the history entry are committed
    /// in one store write; `voting-completed` fires only after that commit.
    pub fn finalize_amendment(&self, id: &str) -> Result<Finalization, CharterError> {
        let (proposal, (result, voting_result)) = self.mutate_with(
            id,
            "finalize",
            |p, now| {
                p.require_status("finalize", &[ProposalStatus::Voting])?;
                let ends = voting_end(p)?;
                if now <= ends {
                    return Err(CharterError::VotingPeriodNotElapsed {
                        id: p.id.clone(),
                        ends,
                        now,
                    });
                }
                let voting_result = tally(&p.voting.votes, p.voting.quorum, p.voting.threshold);
                let result = if voting_result.passed {
                    p.advance(ProposalStatus::Approved, now)?;
                    p.advance(ProposalStatus::Implemented, now)?;
                    FinalOutcome::Approved
                } else {
                    p.advance(ProposalStatus::Rejected, now)?;
                    FinalOutcome::Rejected
                };
                Ok((result, voting_result))
            },
            |next, version, (result, voting_result)| {
                let entry = HistoryEntry {
                    proposal_id: next.id.clone(),
                    title: next.title.clone(),
                    result: *result,
                    voting_result: voting_result.clone(),
                    finalized_date: next.updated_at,
                };
                self.store.finalize(next, version, &entry)
            },
        )?;

        tracing::info!(
            proposal_id = %proposal.id,
            result = result.as_str(),
            summary = %voting_result.summary,
            "amendment finalized"
        );
        self.notifier.notify(&proposal, WorkflowEvent::VotingCompleted);

        Ok(Finalization {
            proposal,
            result,
            voting_result,
        })
    }

    // --- Discussion and revisions ---

    pub fn add_comment(&self, id: &str, input: NewComment) -> Result<Comment, CharterError> {
        let (_, comment) = self.mutate(id, "comment", |p, now| {
            p.require_open("comment on")?;
            let comment = Comment::create(input.clone(), now)?;
            comments::append(&mut p.comments, comment.clone());
            Ok(comment)
        })?;
        tracing::debug!(proposal_id = %id, comment_id = %comment.id, "comment added");
        Ok(comment)
    }

    pub fn reply_to_comment(
        &self,
        id: &str,
        parent_id: &str,
        input: NewComment,
    ) -> Result<Comment, CharterError> {
        let (_, reply) = self.mutate(id, "reply", |p, now| {
            p.require_open("comment on")?;
            let reply = Comment::create(input.clone(), now)?;
            comments::reply(&mut p.comments, parent_id, reply.clone())?;
            Ok(reply)
        })?;
        Ok(reply)
    }

    /// Moderation action; no lifecycle transition depends on it.
    pub fn resolve_comment(&self, id: &str, comment_id: &str) -> Result<Comment, CharterError> {
        let (proposal, _) = self.mutate(id, "resolve", |p, _| {
            comments::resolve(&mut p.comments, comment_id)
        })?;
        comments::find(&proposal.comments, comment_id)
            .cloned()
            .ok_or_else(|| CharterError::ValidationError(format!("Comment '{}' not found", comment_id)))
    }

    pub fn add_supporter(&self, id: &str, supporter: &str) -> Result<Proposal, CharterError> {
        let (proposal, _) = self.mutate(id, "support", |p, _| {
            p.require_open("support")?;
            if supporter.trim().is_empty() {
                return Err(CharterError::ValidationError(
                    "Supporter must not be empty".to_string(),
                ));
            }
            if !p.supporters.iter().any(|s| s == supporter) {
                p.supporters.push(supporter.to_string());
            }
            Ok(())
        })?;
        Ok(proposal)
    }

    pub fn revise_proposal(
        &self,
        id: &str,
        author: &str,
        proposed_text: &str,
        reason: &str,
    ) -> Result<Revision, CharterError> {
        let (_, revision) = self.mutate(id, "revise", |p, now| {
            p.require_status(
                "revise",
                &[
                    ProposalStatus::Draft,
                    ProposalStatus::Proposed,
                    ProposalStatus::UnderReview,
                ],
            )?;
            if proposed_text.trim().is_empty() {
                return Err(CharterError::IncompleteProposal {
                    id: p.id.clone(),
                    missing: vec!["proposed_text".to_string()],
                });
            }
            let revision = Revision {
                number: p.revisions.len() as u32 + 1,
                author: author.to_string(),
                reason: reason.to_string(),
                previous_text: p.proposed_text.clone(),
                proposed_text: proposed_text.to_string(),
                digest: text_digest(proposed_text),
                timestamp: now,
            };
            p.proposed_text = proposed_text.to_string();
            p.revisions.push(revision.clone());
            Ok(revision)
        })?;
        tracing::info!(proposal_id = %id, revision = revision.number, "proposal revised");
        Ok(revision)
    }

    // --- Reads ---

    pub fn get(&self, id: &str) -> Result<Proposal, CharterError> {
        Ok(self.store.get(id)?.proposal)
    }

    pub fn list(&self, filter: &ProposalFilter) -> Result<Vec<Proposal>, CharterError> {
        self.store.list(filter)
    }

    pub fn history(&self) -> Result<Vec<HistoryEntry>, CharterError> {
        self.history.entries()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

fn voting_end(p: &Proposal) -> Result<DateTime<Utc>, CharterError> {
    p.voting.end_date.ok_or_else(|| {
        CharterError::ValidationError(format!(
            "Proposal '{}' is voting but has no voting end date",
            p.id
        ))
    })
}

// --- CLI ---

#[derive(Subcommand, Debug)]
pub enum AmendmentCommand {
    /// Create a new draft proposal.
    Create {
        #[clap(long)]
        title: String,
        #[clap(long, default_value = "")]
        description: String,
        #[clap(long)]
        proposer: String,
        /// constitutional | framework-spec | governance-process | enforcement-rule
        #[clap(long = "type", default_value = "constitutional")]
        kind: String,
        /// breaking | major | minor | patch
        #[clap(long, default_value = "minor")]
        impact: String,
        #[clap(long)]
        current_text: Option<String>,
        #[clap(long, default_value = "")]
        proposed_text: String,
        #[clap(long, default_value = "")]
        rationale: String,
        /// Implementation step (repeatable)
        #[clap(long = "step")]
        implementation_plan: Vec<String>,
        /// Migration note (repeatable)
        #[clap(long = "migration")]
        migration_guide: Vec<String>,
        /// Related constitution article (repeatable)
        #[clap(long = "article")]
        related_articles: Vec<String>,
        /// Affected file (repeatable)
        #[clap(long = "affects")]
        affected_files: Vec<String>,
        #[clap(long)]
        requires_testing: bool,
    },
    /// Submit a draft for community review.
    Submit {
        #[clap(long)]
        id: String,
    },
    /// Add a comment to a proposal.
    Comment {
        #[clap(long)]
        id: String,
        #[clap(long)]
        author: String,
        #[clap(long)]
        content: String,
        /// suggestion | concern | support | question
        #[clap(long = "type", default_value = "suggestion")]
        kind: String,
    },
    /// Reply to an existing comment.
    Reply {
        #[clap(long)]
        id: String,
        #[clap(long)]
        parent: String,
        #[clap(long)]
        author: String,
        #[clap(long)]
        content: String,
        #[clap(long = "type", default_value = "suggestion")]
        kind: String,
    },
    /// Mark a comment resolved (moderation).
    Resolve {
        #[clap(long)]
        id: String,
        #[clap(long)]
        comment: String,
    },
    /// Record a supporter.
    Support {
        #[clap(long)]
        id: String,
        #[clap(long)]
        supporter: String,
    },
    /// Replace the proposed text, keeping a revision record.
    Revise {
        #[clap(long)]
        id: String,
        #[clap(long)]
        author: String,
        #[clap(long)]
        proposed_text: String,
        #[clap(long, default_value = "")]
        reason: String,
    },
    /// Open voting once the review period has elapsed.
    StartVoting {
        #[clap(long)]
        id: String,
    },
    /// Cast a vote.
    Vote {
        #[clap(long)]
        id: String,
        #[clap(long)]
        voter: String,
        /// approve | reject | abstain
        #[clap(long)]
        decision: String,
        #[clap(long)]
        rationale: Option<String>,
    },
    /// Show the current (or final) tally.
    Tally {
        #[clap(long)]
        id: String,
        /// Output format: 'json' or 'text'.
        #[clap(long, default_value = "json")]
        format: String,
    },
    /// Close voting and record the outcome.
    Finalize {
        #[clap(long)]
        id: String,
    },
    /// Show a proposal.
    Show {
        #[clap(long)]
        id: String,
        /// Output format: 'json' or 'text'.
        #[clap(long, default_value = "json")]
        format: String,
    },
    /// List proposals.
    List {
        #[clap(long)]
        status: Option<String>,
        #[clap(long)]
        impact: Option<String>,
        #[clap(long = "type")]
        kind: Option<String>,
        #[clap(long)]
        proposer: Option<String>,
    },
    /// Show the amendment history ledger.
    History,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CharterError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_tally_text(id: &str, result: &VotingResult) -> String {
    let verdict = if result.passed {
        "PASSED".green().bold()
    } else {
        "FAILED".red().bold()
    };
    let quorum = if result.quorum_met {
        "met".green()
    } else {
        "not met".yellow()
    };
    format!(
        "{} {}\n  votes:     {} (quorum {} {})\n  weighted:  approve {} / reject {} / abstain {}\n  approval:  {:.1}% (threshold {:.0}%)",
        verdict,
        id.bold(),
        result.total_votes,
        result.quorum,
        quorum,
        result.approvals,
        result.rejections,
        result.abstentions,
        result.approval_percentage,
        result.threshold,
    )
}

fn render_proposal_text(p: &Proposal) -> String {
    let mut out = format!(
        "{} [{}]\n  id:       {}\n  type:     {} / impact {}\n  proposer: {}\n  review:   {} -> {}\n",
        p.title.bold(),
        p.status.to_string().cyan(),
        p.id,
        p.kind,
        p.impact,
        p.proposer,
        time::iso(&p.review_period.start_date),
        time::iso(&p.review_period.end_date),
    );
    if let (Some(start), Some(end)) = (p.voting.start_date, p.voting.end_date) {
        out.push_str(&format!(
            "  voting:   {} -> {} ({} votes)\n",
            time::iso(&start),
            time::iso(&end),
            p.voting.votes.len()
        ));
    }
    out.push_str(&format!(
        "  comments: {} ({} open concerns), revisions: {}, supporters: {}",
        comments::count(&p.comments),
        comments::unresolved_concerns(&p.comments).len(),
        p.revisions.len(),
        p.supporters.len()
    ));
    out
}

pub fn run_amendment_cli(
    workflow: &AmendmentWorkflow,
    command: AmendmentCommand,
) -> Result<(), CharterError> {
    match command {
        AmendmentCommand::Create {
            title,
            description,
            proposer,
            kind,
            impact,
            current_text,
            proposed_text,
            rationale,
            implementation_plan,
            migration_guide,
            related_articles,
            affected_files,
            requires_testing,
        } => {
            let draft = ProposalDraft {
                title,
                description,
                proposer,
                kind: kind.parse::<ProposalType>()?,
                impact: impact.parse::<Impact>()?,
                current_text,
                proposed_text,
                rationale,
                implementation_plan,
                migration_guide,
                metadata: ProposalMetadata {
                    related_articles,
                    affected_files,
                    requires_testing,
                    precedents: Vec::new(),
                },
            };
            print_json(&workflow.create(draft)?)?;
        }
        AmendmentCommand::Submit { id } => {
            let p = workflow.submit_for_review(&id)?;
            print_json(&time::command_envelope(
                "submit",
                "ok",
                &workflow.now(),
                serde_json::json!({
                    "proposal_id": p.id,
                    "proposal_status": p.status,
                    "review_period": p.review_period,
                }),
            ))?;
        }
        AmendmentCommand::Comment {
            id,
            author,
            content,
            kind,
        } => {
            let input = NewComment::new(&author, &content, kind.parse::<CommentKind>()?);
            print_json(&workflow.add_comment(&id, input)?)?;
        }
        AmendmentCommand::Reply {
            id,
            parent,
            author,
            content,
            kind,
        } => {
            let input = NewComment::new(&author, &content, kind.parse::<CommentKind>()?);
            print_json(&workflow.reply_to_comment(&id, &parent, input)?)?;
        }
        AmendmentCommand::Resolve { id, comment } => {
            print_json(&workflow.resolve_comment(&id, &comment)?)?;
        }
        AmendmentCommand::Support { id, supporter } => {
            let p = workflow.add_supporter(&id, &supporter)?;
            print_json(&serde_json::json!({
                "proposal_id": p.id,
                "supporters": p.supporters,
            }))?;
        }
        AmendmentCommand::Revise {
            id,
            author,
            proposed_text,
            reason,
        } => {
            print_json(&workflow.revise_proposal(&id, &author, &proposed_text, &reason)?)?;
        }
        AmendmentCommand::StartVoting { id } => {
            let p = workflow.start_voting(&id)?;
            let concerns: Vec<&Comment> = comments::unresolved_concerns(&p.comments);
            print_json(&time::command_envelope(
                "start-voting",
                "ok",
                &workflow.now(),
                serde_json::json!({
                    "proposal_id": p.id,
                    "proposal_status": p.status,
                    "voting_start": p.voting.start_date,
                    "voting_end": p.voting.end_date,
                    "unresolved_concerns": concerns,
                }),
            ))?;
        }
        AmendmentCommand::Vote {
            id,
            voter,
            decision,
            rationale,
        } => {
            let ballot = CastVote {
                voter,
                decision: decision.parse::<VoteDecision>()?,
                rationale,
            };
            print_json(&workflow.cast_vote(&id, ballot)?)?;
        }
        AmendmentCommand::Tally { id, format } => {
            let result = workflow.tally_votes(&id)?;
            if format == "text" {
                println!("{}", render_tally_text(&id, &result));
            } else {
                print_json(&result)?;
            }
        }
        AmendmentCommand::Finalize { id } => {
            let fin = workflow.finalize_amendment(&id)?;
            print_json(&time::command_envelope(
                "finalize",
                fin.result.as_str(),
                &workflow.now(),
                serde_json::json!({
                    "proposal_id": fin.proposal.id,
                    "proposal_status": fin.proposal.status,
                    "voting_result": fin.voting_result,
                }),
            ))?;
        }
        AmendmentCommand::Show { id, format } => {
            let p = workflow.get(&id)?;
            if format == "text" {
                println!("{}", render_proposal_text(&p));
            } else {
                print_json(&p)?;
            }
        }
        AmendmentCommand::List {
            status,
            impact,
            kind,
            proposer,
        } => {
            let filter = ProposalFilter {
                status: status.as_deref().map(str::parse).transpose()?,
                impact: impact.as_deref().map(str::parse).transpose()?,
                kind: kind.as_deref().map(str::parse).transpose()?,
                proposer,
            };
            let rows: Vec<serde_json::Value> = workflow
                .list(&filter)?
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "id": p.id,
                        "title": p.title,
                        "status": p.status,
                        "impact": p.impact,
                        "type": p.kind,
                        "proposer": p.proposer,
                        "votes": p.voting.votes.len(),
                    })
                })
                .collect();
            print_json(&rows)?;
        }
        AmendmentCommand::History => {
            print_json(&workflow.history()?)?;
        }
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "amendment",
        "version": "0.1.0",
        "description": "Constitutional amendment lifecycle: review, weighted voting, finalization",
        "commands": [
            { "name": "create", "parameters": ["title", "proposer", "type", "impact", "proposed-text", "rationale"] },
            { "name": "submit", "parameters": ["id"] },
            { "name": "comment", "parameters": ["id", "author", "content", "type"] },
            { "name": "reply", "parameters": ["id", "parent", "author", "content", "type"] },
            { "name": "resolve", "parameters": ["id", "comment"] },
            { "name": "support", "parameters": ["id", "supporter"] },
            { "name": "revise", "parameters": ["id", "author", "proposed-text", "reason"] },
            { "name": "start-voting", "parameters": ["id"] },
            { "name": "vote", "parameters": ["id", "voter", "decision", "rationale"] },
            { "name": "tally", "parameters": ["id", "format"] },
            { "name": "finalize", "parameters": ["id"] },
            { "name": "show", "parameters": ["id", "format"] },
            { "name": "list", "parameters": ["status", "impact", "type", "proposer"] },
            { "name": "history" }
        ],
        "impacts": Impact::ALL.iter().map(|i| {
            let policy = i.policy();
            serde_json::json!({
                "impact": i.as_str(),
                "review_days": policy.review_days,
                "voting_days": policy.voting_days,
                "quorum": policy.quorum,
                "threshold": policy.threshold,
            })
        }).collect::<Vec<_>>(),
        "events": ["review-started", "voting-started", "voting-completed"],
        "storage": ["charter.db", "broker.events.jsonl", "amendment.events.jsonl"]
    })
}
