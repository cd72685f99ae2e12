use gridview::{
    CellRef, CellValue, CellValues, Filter, FilterOperator, FieldTypeRegistry, GridConfig,
    GridSession, MemorySource, Outcome, RealtimeEvent, RealtimeInbox, RecordId, View,
};
use gridview_core::test_support::{
    numbered_records, sample_fields, sample_view, AMOUNT_FIELD, DONE_FIELD, NAME_FIELD,
};
use std::collections::BTreeMap;
use std::thread;

async fn open(view: View, count: u64) -> (GridSession, MemorySource) {
    let source = MemorySource::new(1, sample_fields(), numbered_records(count));
    let mut session = GridSession::new(
        GridConfig::default(),
        view,
        sample_fields(),
        FieldTypeRegistry::with_builtins(),
    );
    session.on_resize(660.0);
    session.fetch_initial(&source).await.expect("initial load");
    (session, source)
}

fn buffered_ids(session: &GridSession) -> Vec<RecordId> {
    session.buffer().rows().iter().map(|row| row.id).collect()
}

fn done(value: bool) -> CellValues {
    [(DONE_FIELD, CellValue::Boolean(value))].into_iter().collect()
}

#[tokio::test]
async fn filtered_view_follows_remote_edits() {
    let mut view = sample_view();
    view.filters = vec![Filter::new(DONE_FIELD, FilterOperator::Boolean, "1")];
    let (mut session, source) = open(view, 10).await;
    assert_eq!(session.buffer().count(), 5);

    for (id, value) in [(3, true), (4, false)] {
        let (before, row) = source
            .update_remote(RecordId::from(id), &done(value))
            .expect("remote update");
        session.apply_realtime(RealtimeEvent::RowUpdated {
            table_id: 1,
            row_before_update: before,
            row,
            metadata: BTreeMap::new(),
        });
    }

    let expected: Vec<RecordId> = [2, 3, 6, 8, 10].into_iter().map(RecordId::from).collect();
    assert_eq!(buffered_ids(&session), expected);
    assert_eq!(session.buffer().count(), 5);
    let from_source: Vec<RecordId> = session
        .fetch_rows_by_index(&source, 0, 10)
        .await
        .expect("rows")
        .iter()
        .map(|row| row.id)
        .collect();
    assert_eq!(from_source, expected);
}

#[tokio::test]
async fn wire_events_from_another_thread_are_reconciled() {
    let (mut session, source) = open(sample_view(), 5).await;
    source.delete_remote(RecordId::from(2)).expect("remote delete");

    let inbox = RealtimeInbox::new();
    let sender = inbox.sender();
    let producer = thread::spawn(move || {
        let payload = r#"{"type":"row_deleted","table_id":1,"row":{"id":2,"order":"2","values":{}}}"#;
        let event = RealtimeEvent::from_json(payload).expect("decode");
        assert!(sender.send(event));
    });
    producer.join().expect("producer thread");

    let outcomes = session
        .drain_realtime(&source, &inbox)
        .await
        .expect("drain");

    assert_eq!(outcomes, vec![Outcome::Removed { index: 1 }]);
    let expected: Vec<RecordId> = [1, 3, 4, 5].into_iter().map(RecordId::from).collect();
    assert_eq!(buffered_ids(&session), expected);
    assert_eq!(session.buffer().count(), source.len());
}

#[tokio::test]
async fn pasted_cells_export_in_their_display_form() {
    let (mut session, source) = open(sample_view(), 5).await;
    let data = vec![vec!["pasted".to_string(), "1.5".to_string()]];

    session
        .paste(&source, &data, Some(CellRef::new(0, 0)), None)
        .await
        .expect("paste");
    let exported = session.export_selected(&source).await.expect("export");

    assert_eq!(
        exported,
        vec![vec!["pasted".to_string(), "1.50".to_string()]]
    );
    let row = session.buffer().get(RecordId::from(1)).expect("row");
    assert_eq!(row.value(NAME_FIELD), &CellValue::text("pasted"));
    assert!(matches!(row.value(AMOUNT_FIELD), CellValue::Number(_)));
}
