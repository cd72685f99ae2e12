//! Session workflows against the in-memory record source.

use super::*;
use crate::memory::{MemorySource, SourceOperation};
use crate::multi_select::CellRef;
use crate::reconcile::Outcome;
use gridview_core::test_support::{
    named_record, numbered_records, sample_fields, sample_view, AMOUNT_FIELD, DONE_FIELD,
    NAME_FIELD,
};
use gridview_core::{CellValue, CellValues, FieldKind, SortRule};

struct Harness {
    session: GridSession,
    source: MemorySource,
}

fn harness_with_view(count: u64, view: View) -> Harness {
    let mut session = GridSession::new(
        GridConfig::default(),
        view,
        sample_fields(),
        FieldTypeRegistry::with_builtins(),
    );
    session.on_resize(660.0);
    Harness {
        session,
        source: MemorySource::new(1, sample_fields(), numbered_records(count)),
    }
}

async fn loaded_with_view(count: u64, view: View) -> Harness {
    let mut harness = harness_with_view(count, view);
    harness
        .session
        .fetch_initial(&harness.source)
        .await
        .expect("initial load");
    harness
}

async fn loaded(count: u64) -> Harness {
    loaded_with_view(count, sample_view()).await
}

fn sorted_by_amount() -> View {
    let mut view = sample_view();
    view.sorts = vec![SortRule::ascending(AMOUNT_FIELD)];
    view
}

fn ids(session: &GridSession) -> Vec<u64> {
    session
        .buffer()
        .rows()
        .iter()
        .map(|row| match row.id {
            RecordId::Persisted(id) => id,
            RecordId::Temporary(_) => 0,
        })
        .collect()
}

fn values_of(values: &[(FieldId, CellValue)]) -> CellValues {
    values.iter().cloned().collect()
}

mod realtime;
