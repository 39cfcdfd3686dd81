use charter::core::broker::{AUDIT_LOG_NAME, AuditEvent, DbBroker, Outcome};
use charter::core::config::CharterConfig;
use charter::core::db;
use charter::core::error::CharterError;
use charter::core::schemas;
use charter::core::store::{STORE_DIR_NAME, Store};
use charter::core::time::{Clock, FixedClock};
use charter::plugins::amendment::AmendmentWorkflow;
use charter::plugins::notify::{EventLogNotifier, WorkflowEvent};
use charter::plugins::proposal::ProposalDraft;
use charter::plugins::registry::{VoterRegistry, VoterRole};
use chrono::{TimeZone, Utc};
use rusqlite::params;
use std::fs;
use std::sync::{Arc, Barrier};
use tempfile::tempdir;

#[test]
fn db_and_broker_round_trip_and_audit() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path().to_path_buf();
    db::initialize_charter_db(&root).expect("init db");
    // Second init is a no-op.
    db::initialize_charter_db(&root).expect("re-init db");

    let db_path = db::charter_db_path(&root);
    let broker = DbBroker::new(&root);
    let version: String = broker
        .with_conn(&db_path, "tester", "meta.read", |conn| {
            Ok(conn.query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )?)
        })
        .expect("read meta");
    assert_eq!(version, schemas::CHARTER_SCHEMA_VERSION.to_string());

    let err = broker
        .with_conn(&db_path, "tester", "meta.fail", |conn| {
            conn.execute(
                "INSERT INTO meta(key, value) VALUES(?1, ?2)",
                params!["schema_version", "dup"],
            )?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, CharterError::RusqliteError(_)));

    let raw = fs::read_to_string(root.join(AUDIT_LOG_NAME)).expect("audit log");
    let events: Vec<AuditEvent> = raw
        .lines()
        .map(|l| serde_json::from_str(l).expect("audit line is json"))
        .collect();
    let tail: Vec<(&str, Outcome)> = events
        .iter()
        .rev()
        .take(2)
        .map(|e| (e.op.as_str(), e.outcome))
        .collect();
    assert_eq!(tail, vec![("meta.fail", Outcome::Failed), ("meta.read", Outcome::Ok)]);
    assert!(events[events.len() - 1]
        .error
        .as_deref()
        .is_some_and(|msg| msg.contains("UNIQUE")));
    assert!(events[events.len() - 2].error.is_none());
    assert_eq!(
        events.iter().filter(|e| e.op == "charter.init").count(),
        2
    );
    assert!(events.iter().all(|e| !e.event_id.is_empty()));
}

#[test]
fn broker_serializes_concurrent_writers() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path().to_path_buf();
    db::initialize_charter_db(&root).expect("init db");
    let db_path = db::charter_db_path(&root);

    let writers = 8;
    let barrier = Arc::new(Barrier::new(writers));
    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let root = root.clone();
            let db_path = db_path.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                DbBroker::new(&root).with_conn(&db_path, "writer", "meta.write", |conn| {
                    conn.execute(
                        "INSERT INTO meta(key, value) VALUES(?1, 'x')",
                        params![format!("k{}", i)],
                    )?;
                    Ok(())
                })
            })
        })
        .collect();
    for h in handles {
        h.join().expect("join").expect("write");
    }

    let events = DbBroker::new(&root).read_events().expect("events");
    assert_eq!(events.iter().filter(|e| e.op == "meta.write").count(), writers);
}

#[test]
fn unwritable_audit_log_does_not_mask_committed_write() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path().to_path_buf();
    db::initialize_charter_db(&root).expect("init db");
    let db_path = db::charter_db_path(&root);

    // A directory cannot be opened for append.
    let audit = root.join(AUDIT_LOG_NAME);
    fs::remove_file(&audit).expect("remove audit log");
    fs::create_dir(&audit).expect("mkdir over audit log");

    let broker = DbBroker::new(&root);
    broker
        .with_conn(&db_path, "tester", "meta.write", |conn| {
            conn.execute(
                "INSERT INTO meta(key, value) VALUES('owner', 'ada')",
                [],
            )?;
            Ok(())
        })
        .expect("committed write reports success");

    let owner: String = broker
        .with_conn(&db_path, "tester", "meta.read", |conn| {
            Ok(conn.query_row("SELECT value FROM meta WHERE key = 'owner'", [], |row| {
                row.get(0)
            })?)
        })
        .expect("read back");
    assert_eq!(owner, "ada");

    let err = broker
        .with_conn(&db_path, "tester", "meta.fail", |conn| {
            conn.execute("INSERT INTO meta(key, value) VALUES('owner', 'x')", [])?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, CharterError::RusqliteError(_)));
}

#[test]
fn store_init_and_discover() {
    let tmp = tempdir().expect("tempdir");
    let store = Store::init(tmp.path()).expect("init");
    assert_eq!(store.root, tmp.path().join(STORE_DIR_NAME));
    assert!(store.root.is_dir());

    let nested = tmp.path().join("docs/governance");
    fs::create_dir_all(&nested).expect("mkdir");
    let found = Store::discover(&nested).expect("discover");
    assert_eq!(found.root, store.root);
    assert_eq!(found.config_path(), store.root.join("config.toml"));
}

#[test]
fn config_file_drives_registry_and_version() {
    let tmp = tempdir().expect("tempdir");
    let store = Store::init(tmp.path()).expect("init");
    fs::write(
        store.config_path(),
        r#"
framework_version = "4.0.0"
allow_unregistered = false

[voters]
"ada@example.org" = "maintainer"
"grace@example.org" = "community"
"#,
    )
    .expect("write config");

    let config = CharterConfig::load(&store.config_path()).expect("load");
    assert_eq!(config.framework_version, "4.0.0");
    assert_eq!(config.voters.get("ada@example.org"), Some(&VoterRole::Maintainer));

    let registry = config.registry();
    assert_eq!(registry.weight_of("ada@example.org"), 3);
    assert!(registry.is_eligible("grace@example.org"));
    assert!(!registry.is_eligible("someone@example.org"));

    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
    ));
    let workflow = AmendmentWorkflow::open(&store, &config, clock, "tester").expect("open");
    let p = workflow
        .create(ProposalDraft {
            title: "Stamped".to_string(),
            proposer: "ada@example.org".to_string(),
            description: "d".to_string(),
            proposed_text: "t".to_string(),
            rationale: "r".to_string(),
            ..Default::default()
        })
        .expect("create");
    assert_eq!(p.version, "4.0.0");

    workflow.submit_for_review(&p.id).expect("submit");
    let records = EventLogNotifier::new(&store.notify_log_path())
        .read_all()
        .expect("notifications");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event, WorkflowEvent::ReviewStarted);
    assert_eq!(records[0].proposal_id, p.id);
    assert_eq!(records[0].status, "under-review");
    assert_eq!(records[0].ts, "2025-06-01T00:00:00Z");
}

#[test]
fn malformed_config_names_the_file() {
    let tmp = tempdir().expect("tempdir");
    let store = Store::init(tmp.path()).expect("init");
    fs::write(store.config_path(), "allow_unregistered = \"perhaps\"").expect("write");
    let err = CharterConfig::load(&store.config_path()).unwrap_err();
    assert!(matches!(err, CharterError::ConfigError(_)));
    assert!(err.to_string().contains("config.toml"));
}
