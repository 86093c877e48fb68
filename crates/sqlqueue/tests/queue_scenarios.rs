//! Black-box integration tests for the core enqueue/handle/respond
//! scenarios (single enqueue, duplicate rejection, one-by-one and batched
//! processing, delete-after-delivery), run against a disposable PostgreSQL
//! container.

mod common;

use common::{build_queue, start_integration_test_postgres};
use sqlqueue::{Request, RowState};
use tracing_test::traced_test;

fn requests(ids: &[i64]) -> Vec<Request> {
    ids.iter()
        .map(|&id| Request::new(id, format!("request{id}").into_bytes()))
        .collect()
}

#[traced_test]
#[tokio::test]
async fn s1_enqueue_new() {
    let (_container, pool) = start_integration_test_postgres().await;
    let (queue, _deliverer) = build_queue(pool, 10, false);

    queue.add(&requests(&[0, 1]), true).await.unwrap();

    let mut ids = queue.not_handled_request_ids().await.unwrap();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1]);
}

#[traced_test]
#[tokio::test]
async fn s2_duplicate_rejection() {
    let (_container, pool) = start_integration_test_postgres().await;
    let (queue, _deliverer) = build_queue(pool, 10, false);

    queue.add(&requests(&[0, 1]), true).await.unwrap();
    let result = queue.add(&requests(&[0, 1]), true).await;
    assert!(result.is_err());

    let mut ids = queue.not_handled_request_ids().await.unwrap();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1]);
}

#[traced_test]
#[tokio::test]
async fn s3_one_by_one() {
    let (_container, pool) = start_integration_test_postgres().await;
    let (queue, deliverer) = build_queue(pool, 1, false);

    queue.add(&requests(&[0, 1]), true).await.unwrap();

    queue.handle().await.unwrap();
    assert_eq!(queue.not_handled_request_ids().await.unwrap().len(), 1);

    queue.handle().await.unwrap();
    assert_eq!(queue.not_handled_request_ids().await.unwrap().len(), 0);

    queue.respond().await.unwrap();
    assert_eq!(deliverer.delivered_ids().len(), 1);

    queue.respond().await.unwrap();
    assert_eq!(deliverer.delivered_ids().len(), 2);

    assert!(queue.not_notified_request_ids().await.unwrap().is_empty());
}

#[traced_test]
#[tokio::test]
async fn row_state_tracks_a_request_through_its_lifecycle() {
    let (_container, pool) = start_integration_test_postgres().await;
    let (queue, _deliverer) = build_queue(pool, 10, false);

    assert_eq!(queue.row_state(0).await.unwrap(), None);

    queue.add(&requests(&[0]), true).await.unwrap();
    assert_eq!(queue.row_state(0).await.unwrap(), Some(RowState::New));

    queue.handle().await.unwrap();
    assert_eq!(queue.row_state(0).await.unwrap(), Some(RowState::Handled));

    queue.respond().await.unwrap();
    assert_eq!(queue.row_state(0).await.unwrap(), Some(RowState::Notified));
}

#[traced_test]
#[tokio::test]
async fn s4_batch() {
    let (_container, pool) = start_integration_test_postgres().await;
    let (queue, _deliverer) = build_queue(pool, 2, false);

    queue.add(&requests(&[0, 1]), true).await.unwrap();

    queue.handle().await.unwrap();
    assert!(queue.not_handled_request_ids().await.unwrap().is_empty());

    queue.respond().await.unwrap();

    let mut notified = queue.notified_request_ids().await.unwrap();
    notified.sort_unstable();
    assert_eq!(notified, vec![0, 1]);

    assert_eq!(queue.delete_all().await.unwrap(), 2);
}

#[traced_test]
#[tokio::test]
async fn s5_delete_after_delivery() {
    let (_container, pool) = start_integration_test_postgres().await;
    let (queue, _deliverer) = build_queue(pool, 2, true);

    queue.add(&requests(&[0, 1]), true).await.unwrap();
    queue.handle().await.unwrap();
    queue.respond().await.unwrap();

    assert!(queue.not_notified_request_ids().await.unwrap().is_empty());
    assert_eq!(queue.delete_all().await.unwrap(), 0);
}
