//! Remote changes arriving through the realtime inbox.

use super::*;
use crate::realtime::{RealtimeEvent, RealtimeInbox};
use serde_json::json;
use std::collections::BTreeMap;

fn created(row: Record) -> RealtimeEvent {
    RealtimeEvent::RowCreated {
        table_id: 1,
        row,
        metadata: BTreeMap::new(),
    }
}

fn deleted(row: Record) -> RealtimeEvent {
    RealtimeEvent::RowDeleted { table_id: 1, row }
}

async fn scrolled_to_the_middle() -> Harness {
    let mut harness = loaded(1000).await;
    harness
        .session
        .fetch_by_scroll(&harness.source, 16_203.0)
        .await
        .expect("scroll");
    harness
}

#[tokio::test]
async fn remote_row_at_the_end_is_appended() {
    let mut harness = loaded(5).await;
    let row = harness
        .source
        .insert_remote(&values_of(&[(NAME_FIELD, CellValue::text("6"))]), None)
        .expect("remote insert");

    let outcomes = harness.session.apply_realtime(created(row));

    assert_eq!(outcomes, vec![Outcome::Inserted { index: 5 }]);
    assert_eq!(ids(&harness.session), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(harness.session.buffer().count(), 6);
}

#[tokio::test]
async fn remote_delete_before_the_window_shifts_it() {
    let mut harness = scrolled_to_the_middle().await;
    let row = harness
        .source
        .delete_remote(RecordId::from(3))
        .expect("remote delete");

    let outcomes = harness.session.apply_realtime(deleted(row));

    assert_eq!(
        outcomes,
        vec![Outcome::Boundary {
            start_delta: -1,
            count_delta: -1
        }]
    );
    let buffer = harness.session.buffer();
    assert_eq!((buffer.start(), buffer.count()), (479, 999));
    assert_eq!(harness.session.global_index(RecordId::from(481)), Some(479));
}

#[tokio::test]
async fn remote_delete_of_the_first_row_removes_it() {
    let mut harness = loaded(5).await;
    let row = harness
        .source
        .delete_remote(RecordId::from(1))
        .expect("remote delete");

    let outcomes = harness.session.apply_realtime(deleted(row));

    assert_eq!(outcomes, vec![Outcome::Removed { index: 0 }]);
    assert_eq!(harness.session.buffer().start(), 0);
    assert_eq!(ids(&harness.session), vec![2, 3, 4, 5]);
}

#[tokio::test]
async fn repeated_update_event_changes_nothing_the_second_time() {
    let mut harness = loaded(5).await;
    let (before, after) = harness
        .source
        .update_remote(
            RecordId::from(2),
            &values_of(&[(NAME_FIELD, CellValue::text("remote"))]),
        )
        .expect("remote update");
    let event = RealtimeEvent::RowUpdated {
        table_id: 1,
        row_before_update: before,
        row: after,
        metadata: BTreeMap::new(),
    };

    assert_eq!(
        harness.session.apply_realtime(event.clone()),
        vec![Outcome::UpdatedInPlace { index: 1 }]
    );
    assert_eq!(
        harness.session.apply_realtime(event),
        vec![Outcome::Unchanged]
    );
    let row = harness.session.buffer().get(RecordId::from(2)).expect("row");
    assert_eq!(row.value(NAME_FIELD), &CellValue::text("remote"));
}

#[tokio::test]
async fn events_for_other_tables_are_ignored() {
    let mut harness = loaded(5).await;
    let outcomes = harness.session.apply_realtime(RealtimeEvent::RowDeleted {
        table_id: 2,
        row: named_record(1, 1, "row 1"),
    });
    assert!(outcomes.is_empty());
    assert_eq!(ids(&harness.session), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn created_row_metadata_is_kept() {
    let mut harness = loaded(5).await;
    let row = harness
        .source
        .insert_remote(&CellValues::new(), Some(RecordId::from(2)))
        .expect("remote insert");
    let id = row.id;

    harness.session.apply_realtime(RealtimeEvent::RowCreated {
        table_id: 1,
        row,
        metadata: BTreeMap::from([("comments".to_string(), json!(3))]),
    });

    assert_eq!(ids(&harness.session), vec![1, 6, 2, 3, 4, 5]);
    let row = harness.session.buffer().get(id).expect("created row");
    assert_eq!(row.state.metadata.get("comments"), Some(&json!(3)));
}

#[tokio::test]
async fn forced_refresh_is_carried_out_on_drain() {
    let mut harness = loaded(5).await;
    let inbox = RealtimeInbox::new();
    inbox.push(RealtimeEvent::ForceViewRowsRefresh { view_id: 2 });
    harness
        .session
        .drain_realtime(&harness.source, &inbox)
        .await
        .expect("drain");
    assert!(!harness.session.needs_refresh());
    assert_eq!(harness.source.page_requests().len(), 1);

    inbox.push(RealtimeEvent::ForceViewRowsRefresh { view_id: 1 });
    harness.session.apply_realtime(RealtimeEvent::ForceViewRowsRefresh { view_id: 1 });
    assert!(harness.session.needs_refresh());
    harness
        .session
        .drain_realtime(&harness.source, &inbox)
        .await
        .expect("drain");

    assert!(!harness.session.needs_refresh());
    assert_eq!(harness.source.page_requests().last(), Some(&(0, 120)));
    assert!(inbox.is_empty());
}

#[tokio::test]
async fn mixed_remote_changes_keep_the_window_aligned_with_the_table() {
    let mut harness = scrolled_to_the_middle().await;
    let inbox = RealtimeInbox::new();
    let early = harness
        .source
        .insert_remote(&CellValues::new(), Some(RecordId::from(100)))
        .expect("insert early");
    inbox.push(created(early));
    let inside = harness
        .source
        .delete_remote(RecordId::from(500))
        .expect("delete inside");
    inbox.push(deleted(inside));
    let late = harness
        .source
        .insert_remote(&CellValues::new(), None)
        .expect("insert late");
    inbox.push(created(late));

    let outcomes = harness
        .session
        .drain_realtime(&harness.source, &inbox)
        .await
        .expect("drain");

    assert_eq!(
        outcomes,
        vec![
            Outcome::Boundary {
                start_delta: 1,
                count_delta: 1
            },
            Outcome::Removed { index: 19 },
            Outcome::Boundary {
                start_delta: 0,
                count_delta: 1
            },
        ]
    );
    let buffer = harness.session.buffer();
    assert!(buffer.is_consistent());
    assert_eq!(buffer.count(), harness.source.len());
    let expected: Vec<RecordId> = harness
        .source
        .records()
        .iter()
        .skip(buffer.start())
        .take(buffer.limit())
        .map(|record| record.id)
        .collect();
    let actual: Vec<RecordId> = buffer.rows().iter().map(|row| row.id).collect();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn remote_edit_past_the_window_needs_no_catch_up_fetch() {
    let mut harness = scrolled_to_the_middle().await;
    let (before, after) = harness
        .source
        .update_remote(
            RecordId::from(900),
            &values_of(&[(AMOUNT_FIELD, CellValue::Number(5_000.into()))]),
        )
        .expect("remote update");
    let inbox = RealtimeInbox::new();
    inbox.push(RealtimeEvent::RowUpdated {
        table_id: 1,
        row_before_update: before,
        row: after,
        metadata: BTreeMap::new(),
    });
    let requests = harness.source.requests().len();

    let outcomes = harness
        .session
        .drain_realtime(&harness.source, &inbox)
        .await
        .expect("drain");

    assert_eq!(
        outcomes,
        vec![Outcome::Boundary {
            start_delta: 0,
            count_delta: 0
        }]
    );
    assert_eq!(harness.source.requests().len(), requests);
    assert_eq!(harness.session.buffer().count(), 1000);
}
