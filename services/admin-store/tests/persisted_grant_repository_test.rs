mod common;

use admin_store::domain::log::{LogEntry, LogRepository};
use admin_store::domain::persisted_grant::{PersistedGrant, PersistedGrantRepository};
use chrono::{Duration, Utc};
use common::TestDb;
use ids_common::Pagination;

fn grant(key: &str, subject_id: &str, age_minutes: i64) -> PersistedGrant {
    PersistedGrant {
        key: key.to_string(),
        grant_type: "refresh_token".to_string(),
        subject_id: subject_id.to_string(),
        client_id: "web".to_string(),
        creation_time: Utc::now() - Duration::minutes(age_minutes),
        expiration: None,
        data: "{}".to_string(),
    }
}

fn log(message: &str, level: &str) -> LogEntry {
    LogEntry {
        id: 0,
        message: Some(message.to_string()),
        message_template: None,
        level: Some(level.to_string()),
        timestamp: Utc::now(),
        exception: None,
        log_event: None,
        properties: None,
    }
}

async fn seeded_grants() -> TestDb {
    let db = TestDb::new().await;
    for g in [
        grant("k1", "alice", 30),
        grant("k2", "alice", 10),
        grant("k3", "alice", 20),
        grant("k4", "bob", 5),
        grant("k5", "carol", 1),
    ] {
        db.context.add_persisted_grant(g).await.expect("Failed to seed grant");
    }
    db
}

#[tokio::test]
async fn test_subjects_are_distinct_with_counts() {
    let db = seeded_grants().await;
    let repo = db.persisted_grants();

    let page = repo.get_persisted_grants_by_users("", Pagination::new(1, 2)).await.unwrap();

    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].subject_id, "alice");
    assert_eq!(page.items[0].grant_count, 3);
    assert_eq!(page.items[1].subject_id, "bob");

    let filtered = repo.get_persisted_grants_by_users("CAR", Pagination::new(1, 10)).await.unwrap();
    assert_eq!(filtered.total, 1);
    assert_eq!(filtered.items[0].subject_id, "carol");
}

#[tokio::test]
async fn test_grants_of_subject_newest_first() {
    let db = seeded_grants().await;
    let repo = db.persisted_grants();

    let page = repo.get_persisted_grants_by_user("alice", Pagination::new(1, 10)).await.unwrap();
    let keys: Vec<&str> = page.items.iter().map(|g| g.key.as_str()).collect();

    assert_eq!(page.total, 3);
    assert_eq!(keys, vec!["k2", "k3", "k1"]);
}

#[tokio::test]
async fn test_delete_by_key_and_subject() {
    let db = seeded_grants().await;
    let repo = db.persisted_grants();

    assert!(repo.get_persisted_grant("k4").await.unwrap().is_some());
    assert_eq!(repo.delete_persisted_grant("k4").await.unwrap(), 1);
    assert_eq!(repo.delete_persisted_grant("k4").await.unwrap(), 0);
    assert!(!repo.exists_persisted_grants("bob").await.unwrap());

    assert!(repo.exists_persisted_grants("alice").await.unwrap());
    assert_eq!(repo.delete_persisted_grants("alice").await.unwrap(), 3);
    assert!(!repo.exists_persisted_grants("alice").await.unwrap());
    assert_eq!(repo.get_persisted_grants_by_users("", Pagination::new(1, 10)).await.unwrap().total, 1);
}

#[tokio::test]
async fn test_duplicate_grant_key_is_rejected() {
    let db = seeded_grants().await;
    assert!(db.context.add_persisted_grant(grant("k1", "dave", 0)).await.is_err());
}

#[tokio::test]
async fn test_logs_search_newest_first() {
    let db = TestDb::new().await;
    db.context.add_log(log("Application started", "Information")).await.unwrap();
    db.context.add_log(log("Token validation failed", "Error")).await.unwrap();
    let mut with_exception = log("Request aborted", "Warning");
    with_exception.exception = Some("TimeoutException".to_string());
    db.context.add_log(with_exception).await.unwrap();
    let repo = db.logs();

    let all = repo.get_logs("", Pagination::new(1, 10)).await.unwrap();
    let ids: Vec<i64> = all.items.iter().map(|e| e.id).collect();
    assert_eq!(all.total, 3);
    assert_eq!(ids, vec![3, 2, 1]);

    assert_eq!(repo.get_logs("error", Pagination::new(1, 10)).await.unwrap().total, 1);
    assert_eq!(repo.get_logs("timeout", Pagination::new(1, 10)).await.unwrap().total, 1);

    let page = repo.get_logs("", Pagination::new(2, 2)).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, 1);
}
