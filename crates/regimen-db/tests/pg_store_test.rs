//! Integration tests for [`PgStore`] against a real PostgreSQL database.
//!
//! Each test creates an isolated temporary database through
//! `regimen-test-utils` and drops it afterwards. They need a container
//! runtime (or `REGIMEN_TEST_PG_URL`), so they are ignored by default:
//! run with `cargo test -p regimen-db -- --ignored`.

use regimen_db::models::{NewPlan, PlanStatus, StatusChange};
use regimen_db::pool;
use regimen_db::store::{IntakeStore, PgStore, PlanStore};
use regimen_test_utils::{create_test_db, drop_test_db, fat_loss_dumbbell_answers};

fn new_plan(intake_id: uuid::Uuid) -> NewPlan {
    NewPlan {
        intake_id,
        client_ref: Some("client-42".into()),
        structure: serde_json::json!({ "weeks": [{ "title": "Week 1" }] }),
        validation: serde_json::json!({ "pass": true, "violations": [] }),
        catalog_version: "deadbeef".into(),
        used_fallback: false,
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn insert_and_fetch_intake() {
    let (pool, db_name) = create_test_db().await;
    let store = PgStore::new(pool.clone());

    let answers = fat_loss_dumbbell_answers();
    let intake = store
        .insert_intake(Some("client-42"), &answers)
        .await
        .expect("insert_intake should succeed");

    let fetched = store
        .get_intake(intake.id)
        .await
        .expect("get_intake should succeed")
        .expect("intake should exist");
    assert_eq!(fetched.answers, answers);
    assert_eq!(fetched.client_ref.as_deref(), Some("client-42"));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn plans_are_versioned_per_intake() {
    let (pool, db_name) = create_test_db().await;
    let store = PgStore::new(pool.clone());

    let intake = store
        .insert_intake(None, &fat_loss_dumbbell_answers())
        .await
        .unwrap();

    let first = store.insert_plan(&new_plan(intake.id)).await.unwrap();
    let second = store.insert_plan(&new_plan(intake.id)).await.unwrap();

    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);
    assert_eq!(first.status, PlanStatus::Draft);
    assert_eq!(first.catalog_version, "deadbeef");

    let latest = store
        .latest_plan_for_intake(intake.id)
        .await
        .unwrap()
        .expect("latest plan should exist");
    assert_eq!(latest.id, second.id);

    let all = store.list_plans().await.unwrap();
    assert_eq!(all.len(), 2);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn status_transitions_are_guarded() {
    let (pool, db_name) = create_test_db().await;
    let store = PgStore::new(pool.clone());

    let intake = store
        .insert_intake(None, &fat_loss_dumbbell_answers())
        .await
        .unwrap();
    let plan = store.insert_plan(&new_plan(intake.id)).await.unwrap();

    let send = StatusChange::MarkSent {
        channel: "pdf".into(),
    };
    let approve = StatusChange::Approve {
        approved_by: "coach-kim".into(),
    };

    // Cannot skip approval.
    assert_eq!(store.transition_plan_status(plan.id, &send).await.unwrap(), 0);

    assert_eq!(store.transition_plan_status(plan.id, &approve).await.unwrap(), 1);
    // Second approval is a no-op.
    assert_eq!(store.transition_plan_status(plan.id, &approve).await.unwrap(), 0);
    assert_eq!(store.transition_plan_status(plan.id, &send).await.unwrap(), 1);

    let stored = store.get_plan(plan.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PlanStatus::Sent);
    assert_eq!(stored.approved_by.as_deref(), Some("coach-kim"));
    assert_eq!(stored.delivery_channel.as_deref(), Some("pdf"));
    assert!(stored.approved_at.is_some());
    assert!(stored.sent_at.is_some());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn table_counts_cover_both_tables() {
    let (pool, db_name) = create_test_db().await;

    let counts = pool::table_counts(&pool).await.unwrap();
    let names: Vec<&str> = counts.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(names, vec!["intakes", "plans"]);
    assert!(counts.iter().all(|(_, c)| *c == 0));

    pool.close().await;
    drop_test_db(&db_name).await;
}
