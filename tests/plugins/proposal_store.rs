use charter::core::broker::{DbBroker, Outcome};
use charter::core::error::CharterError;
use charter::plugins::proposal::{
    Impact, Proposal, ProposalDraft, ProposalFilter, ProposalStatus, ProposalType,
};
use charter::plugins::proposal_store::{
    FinalOutcome, HistoryEntry, HistoryLog, ProposalStore, SqliteProposalStore,
};
use charter::plugins::tally::tally;
use chrono::{Duration, TimeZone, Utc};
use tempfile::tempdir;

fn sample(title: &str, offset_secs: i64) -> Proposal {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(offset_secs);
    Proposal::from_draft(
        ProposalDraft {
            title: title.to_string(),
            description: "d".to_string(),
            proposer: "ada@example.org".to_string(),
            kind: ProposalType::GovernanceProcess,
            impact: Impact::Patch,
            proposed_text: "text".to_string(),
            rationale: "why".to_string(),
            ..Default::default()
        },
        "1.0.0",
        at,
    )
}

#[test]
fn test_create_get_and_duplicate() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteProposalStore::open(tmp.path()).expect("open");
    let p = sample("Stored", 0);

    let created = store.create(&p).expect("create");
    assert_eq!(created.version, 1);
    let fetched = store.get(&p.id).expect("get");
    assert_eq!(fetched.proposal, p);
    assert_eq!(fetched.version, 1);

    let err = store.create(&p).unwrap_err();
    assert!(matches!(err, CharterError::DuplicateProposal(ref id) if id == &p.id));

    let missing = store.get("nope-0").unwrap_err();
    assert!(matches!(missing, CharterError::ProposalNotFound(_)));
}

#[test]
fn test_update_is_version_checked() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteProposalStore::open(tmp.path()).expect("open");
    let p = sample("Versioned", 0);
    store.create(&p).expect("create");

    let mut first = store.get(&p.id).expect("get").proposal;
    first.supporters.push("grace".to_string());
    assert_eq!(store.update(&first, 1).expect("update"), 2);

    // A writer holding the stale version loses.
    let mut stale = p.clone();
    stale.supporters.push("mallory".to_string());
    let err = store.update(&stale, 1).unwrap_err();
    assert!(matches!(err, CharterError::VersionConflict { expected: 1, .. }));
    assert!(err.is_retryable());

    let current = store.get(&p.id).expect("get");
    assert_eq!(current.version, 2);
    assert_eq!(current.proposal.supporters, vec!["grace".to_string()]);

    let mut ghost = sample("Ghost", 0);
    ghost.id = "ghost-1".to_string();
    assert!(matches!(
        store.update(&ghost, 1),
        Err(CharterError::ProposalNotFound(_))
    ));
}

#[test]
fn test_unchanged_round_trip_is_byte_identical() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteProposalStore::open(tmp.path()).expect("open");
    let mut p = sample("Round trip", 0);
    p.current_text = Some("old".to_string());
    p.metadata.related_articles = vec!["Article II".to_string()];
    store.create(&p).expect("create");

    let before = store.document(&p.id).expect("document");
    let stored = store.get(&p.id).expect("get");
    store.update(&stored.proposal, stored.version).expect("update");
    let after = store.document(&p.id).expect("document");
    assert_eq!(before, after);
}

#[test]
fn test_list_orders_newest_first_and_filters() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteProposalStore::open(tmp.path()).expect("open");
    let older = sample("Older", 0);
    let newer = sample("Newer", 60);
    store.create(&older).expect("create");
    store.create(&newer).expect("create");

    let mut advanced = store.get(&older.id).expect("get").proposal;
    advanced
        .advance(ProposalStatus::UnderReview, older.created_at)
        .expect("advance");
    store.update(&advanced, 1).expect("update");

    let ids: Vec<String> = store
        .list(&ProposalFilter::default())
        .expect("list")
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![newer.id.clone(), older.id.clone()]);

    let reviewing = store
        .list(&ProposalFilter {
            status: Some(ProposalStatus::UnderReview),
            kind: Some(ProposalType::GovernanceProcess),
            ..Default::default()
        })
        .expect("list");
    assert_eq!(reviewing.len(), 1);
    assert_eq!(reviewing[0].id, older.id);

    let nobody = store
        .list(&ProposalFilter {
            proposer: Some("nobody".to_string()),
            ..Default::default()
        })
        .expect("list");
    assert!(nobody.is_empty());
}

#[test]
fn test_history_is_append_only_in_order() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteProposalStore::open(tmp.path()).expect("open");
    let at = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();

    for (i, outcome) in [FinalOutcome::Rejected, FinalOutcome::Approved]
        .into_iter()
        .enumerate()
    {
        store
            .record(&HistoryEntry {
                proposal_id: format!("p-{}", i),
                title: format!("Proposal {}", i),
                result: outcome,
                voting_result: tally(&[], 3, 50.0),
                finalized_date: at + Duration::milliseconds(i as i64 * 1500),
            })
            .expect("record");
    }

    let entries = store.entries().expect("entries");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].proposal_id, "p-0");
    assert_eq!(entries[0].result, FinalOutcome::Rejected);
    assert_eq!(entries[1].finalized_date, at + Duration::milliseconds(1500));
}

#[test]
fn test_operations_are_audited_under_actor() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteProposalStore::open(tmp.path())
        .expect("open")
        .with_actor("ci-bot");
    let p = sample("Audited", 0);
    store.create(&p).expect("create");
    let _ = store.get("missing-0");

    let events = DbBroker::new(tmp.path()).read_events().expect("events");
    let ops: Vec<(&str, Outcome, &str)> = events
        .iter()
        .filter(|e| e.actor == "ci-bot")
        .map(|e| (e.op.as_str(), e.outcome, e.db.as_str()))
        .collect();
    assert_eq!(
        ops,
        vec![
            ("proposal.create", Outcome::Ok, "charter.db"),
            ("proposal.get", Outcome::Failed, "charter.db"),
        ]
    );
    assert!(events.iter().any(|e| e.op == "charter.init"));
}

#[test]
fn test_finalize_commits_proposal_and_history_together() {
    let tmp = tempdir().expect("tempdir");
    let store = SqliteProposalStore::open(tmp.path()).expect("open");
    let p = sample("Closing", 0);
    store.create(&p).expect("create");

    let mut closed = p.clone();
    closed.supporters.push("grace".to_string());
    let entry = HistoryEntry {
        proposal_id: p.id.clone(),
        title: p.title.clone(),
        result: FinalOutcome::Rejected,
        voting_result: tally(&[], 3, 50.0),
        finalized_date: p.updated_at,
    };

    // A stale version writes neither the document nor the history row.
    let err = store.finalize(&closed, 7, &entry).unwrap_err();
    assert!(matches!(err, CharterError::VersionConflict { expected: 7, .. }));
    assert!(store.entries().expect("entries").is_empty());
    assert_eq!(store.get(&p.id).expect("get").proposal, p);

    assert_eq!(store.finalize(&closed, 1, &entry).expect("finalize"), 2);
    assert_eq!(store.get(&p.id).expect("get").proposal, closed);
    let entries = store.entries().expect("entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].proposal_id, p.id);
}
