//! Scripted grid view session against a seeded in-memory table.
//!
//! Useful for watching buffer transitions with `RUST_LOG=gridview_session=debug`.

use std::time::{Duration, Instant};

use anyhow::Context;
use bigdecimal::BigDecimal;
use clap::Parser;
use gridview::{
    CellValue, CellValues, Field, FieldId, FieldKind, FieldSet, FieldTypeRegistry, GridConfig,
    GridError, GridSession, MemorySource, OrderKey, RealtimeEvent, RealtimeInbox, Record,
    RecordId, ScrollDecision, View,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TABLE_ID: u64 = 1;
const VIEW_ID: u64 = 1;
const NAME: FieldId = FieldId(1);
const AMOUNT: FieldId = FieldId(2);
const DONE: FieldId = FieldId(3);

#[derive(Parser, Debug)]
#[command(name = "gridview-sim", about = "Drive a grid view session with random traffic", version)]
struct Cli {
    /// Rows in the simulated table.
    #[arg(long, default_value_t = 5_000, env = "GRIDVIEW_SIM_ROWS")]
    rows: u64,

    /// Scroll, edit and remote-change rounds to run.
    #[arg(long, default_value_t = 50)]
    steps: usize,

    /// Seed for the random generator.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Viewport height in pixels.
    #[arg(long, default_value_t = 800.0)]
    height: f64,

    /// Artificial latency per source fetch, in milliseconds.
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gridview=info,gridview_session=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = GridConfig::from_env();
    let mut rng = StdRng::seed_from_u64(cli.seed);

    let mut source = MemorySource::new(TABLE_ID, fields(), seed_records(&mut rng, cli.rows));
    if cli.latency_ms > 0 {
        source = source.with_latency(Duration::from_millis(cli.latency_ms));
    }
    let mut session = GridSession::new(
        config,
        View::new(VIEW_ID, TABLE_ID),
        fields(),
        FieldTypeRegistry::with_builtins(),
    );
    session.on_resize(cli.height);
    session
        .fetch_initial(&source)
        .await
        .context("initial load failed")?;

    let inbox = RealtimeInbox::new();
    let remote = inbox.sender();
    let clock = Instant::now();
    let mut scroll_top = 0.0;

    for step in 0..cli.steps {
        let now = clock + Duration::from_millis(u64::try_from(step).unwrap_or(0) * 250);
        let max_top = session.placeholder_height().max(1.0);
        scroll_top = if rng.gen_bool(0.3) {
            rng.gen_range(0.0..max_top)
        } else {
            (scroll_top + rng.gen_range(-600.0..600.0)).clamp(0.0, max_top)
        };
        let due = match session.on_scroll(scroll_top, now) {
            ScrollDecision::Fire(top) => Some(top),
            ScrollDecision::Deferred { at, .. } => session.poll_scroll(at),
        };
        if let Some(top) = due {
            match session.fetch_by_scroll(&source, top).await {
                Ok(_) | Err(GridError::Cancelled) => {}
                Err(err) => tracing::warn!("scroll fetch failed: {}", err),
            }
        }

        if let Some(event) = remote_change(&source, &mut rng) {
            remote.send(event);
        }
        if rng.gen_bool(0.2) {
            local_edit(&mut session, &source, &mut rng).await;
        }
        if let Err(err) = session.drain_realtime(&source, &inbox).await {
            tracing::warn!("realtime catch-up failed: {}", err);
        }

        let buffer = session.buffer();
        tracing::info!(
            step,
            scroll_top,
            start = buffer.start(),
            limit = buffer.limit(),
            count = buffer.count(),
            visible = session.visible_rows().len(),
            "buffer state"
        );
        if !buffer.is_consistent() {
            anyhow::bail!("buffer bookkeeping drifted at step {step}");
        }
    }

    session
        .search_and_refresh(&source, "7", true)
        .await
        .context("search refresh failed")?;
    tracing::info!(
        matches = session.buffer().count(),
        "rows matching search term"
    );
    Ok(())
}

fn fields() -> FieldSet {
    FieldSet::new(
        Field::new(NAME.0, "Name", FieldKind::Text),
        vec![
            Field::new(AMOUNT.0, "Amount", FieldKind::Number).with_decimal_places(2),
            Field::new(DONE.0, "Done", FieldKind::Boolean),
        ],
    )
}

fn seed_records(rng: &mut StdRng, rows: u64) -> Vec<Record> {
    (1..=rows)
        .map(|id| {
            let order = OrderKey::from_integer(i64::try_from(id).unwrap_or(i64::MAX));
            Record::new(RecordId::from(id), order)
                .with_value(NAME, CellValue::text(format!("item {id}")))
                .with_value(AMOUNT, CellValue::Number(random_amount(rng)))
                .with_value(DONE, CellValue::Boolean(rng.gen_bool(0.5)))
        })
        .collect()
}

fn random_amount(rng: &mut StdRng) -> BigDecimal {
    BigDecimal::new(rng.gen_range(0i64..1_000_000).into(), 2)
}

fn random_id(source: &MemorySource, rng: &mut StdRng) -> Option<RecordId> {
    let records = source.records();
    if records.is_empty() {
        return None;
    }
    records.get(rng.gen_range(0..records.len())).map(|record| record.id)
}

/// Mutate the source as another client would and describe it as an event.
fn remote_change(source: &MemorySource, rng: &mut StdRng) -> Option<RealtimeEvent> {
    match rng.gen_range(0..4) {
        0 => {
            let before = random_id(source, rng);
            let values: CellValues = [(NAME, CellValue::text("remote row"))].into_iter().collect();
            let row = source.insert_remote(&values, before).ok()?;
            Some(RealtimeEvent::RowCreated {
                table_id: TABLE_ID,
                row,
                metadata: Default::default(),
            })
        }
        1 => {
            let id = random_id(source, rng)?;
            let values: CellValues = [(AMOUNT, CellValue::Number(random_amount(rng)))]
                .into_iter()
                .collect();
            let (before, row) = source.update_remote(id, &values).ok()?;
            Some(RealtimeEvent::RowUpdated {
                table_id: TABLE_ID,
                row_before_update: before,
                row,
                metadata: Default::default(),
            })
        }
        2 => {
            let id = random_id(source, rng)?;
            let before = random_id(source, rng).filter(|other| *other != id);
            let (before_update, row) = source.move_remote(id, before).ok()?;
            Some(RealtimeEvent::RowMoved {
                table_id: TABLE_ID,
                row_before_update: before_update,
                row,
            })
        }
        _ => {
            let id = random_id(source, rng)?;
            let row = source.delete_remote(id).ok()?;
            Some(RealtimeEvent::RowDeleted {
                table_id: TABLE_ID,
                row,
            })
        }
    }
}

async fn local_edit(session: &mut GridSession, source: &MemorySource, rng: &mut StdRng) {
    let Some(id) = session
        .visible_rows()
        .first()
        .map(|row| row.id)
        .filter(|id| matches!(id, RecordId::Persisted(_)))
    else {
        return;
    };
    let result = if rng.gen_bool(0.5) {
        session
            .update_row_value(source, id, DONE, CellValue::Boolean(rng.gen_bool(0.5)))
            .await
    } else {
        session
            .create_row(source, Some(id), &CellValues::new())
            .await
            .map(|_| ())
    };
    if let Err(err) = result {
        tracing::warn!("local edit on {:?} failed: {}", id, err);
    }
}
