use super::window::ScrollDirection;
use super::*;
use gridview_core::test_support::numbered_records;

fn buffer_over(all: &[Record], limit: usize) -> RowBuffer {
    let mut buffer = RowBuffer::new(&GridConfig::default());
    buffer.set_window_height(660.0);
    buffer.replace(all[..limit].to_vec(), 0, all.len());
    buffer
}

fn serve(all: &[Record], plan: &FetchPlan) -> Vec<Record> {
    all.iter()
        .skip(plan.offset)
        .take(plan.limit)
        .cloned()
        .collect()
}

fn assert_contiguous(buffer: &RowBuffer) {
    for (local, row) in buffer.rows().iter().enumerate() {
        let expected = RecordId::from((buffer.start() + local + 1) as u64);
        assert_eq!(row.id, expected, "row {local} out of place");
    }
}

#[test]
fn resize_sets_padding_to_half_the_window() {
    let all = numbered_records(200);
    let buffer = buffer_over(&all, 80);
    assert_eq!(buffer.viewport().padding, 10);
    assert_eq!(buffer.visible().range(), 0..20);
    assert_eq!(buffer.visible_rows().len(), 20);
    assert_eq!(buffer.placeholder_height(), 200.0 * 33.0);
}

#[test]
fn jump_scroll_replaces_the_buffer() {
    let all = numbered_records(1000);
    let mut buffer = buffer_over(&all, 80);

    let plan = buffer.plan_scroll(16_203.0).expect("plan");
    assert_eq!(plan.direction, ScrollDirection::Down);
    assert_eq!((plan.offset, plan.limit), (480, 80));
    assert_eq!(buffer.phase(), BufferPhase::Extending);

    buffer.apply_fetch(&plan, serve(&all, &plan), 1000);
    assert_eq!((buffer.start(), buffer.limit()), (480, 80));
    assert_eq!(buffer.phase(), BufferPhase::Ready);
    assert_contiguous(&buffer);
    // middle 500 with padding 10
    assert_eq!(buffer.visible().range(), 10..31);
    assert_eq!(buffer.window_top_offset(), 490.0 * 33.0);
}

#[test]
fn identical_request_is_not_issued_twice() {
    let all = numbered_records(1000);
    let mut buffer = buffer_over(&all, 80);
    assert!(buffer.plan_scroll(16_203.0).is_some());
    assert!(buffer.plan_scroll(16_203.0).is_none());
    buffer.clear_last_request();
    assert!(buffer.plan_scroll(16_203.0).is_some());
}

#[test]
fn scrolling_up_prepends_and_trims_the_tail() {
    let all = numbered_records(1000);
    let mut buffer = RowBuffer::new(&GridConfig::default());
    buffer.set_window_height(660.0);
    buffer.replace(all[480..560].to_vec(), 480, 1000);

    // middle row 470
    let plan = buffer.plan_scroll(15_213.0).expect("plan");
    assert_eq!(plan.direction, ScrollDirection::Up);
    assert_eq!((plan.offset, plan.limit), (440, 40));
    buffer.apply_fetch(&plan, serve(&all, &plan), 1000);
    assert_eq!((buffer.start(), buffer.limit()), (440, 80));
    assert_contiguous(&buffer);
}

#[test]
fn short_page_after_shrinking_table_keeps_window_inside_count() {
    let all = numbered_records(1000);
    let mut buffer = buffer_over(&all, 80);
    let plan = buffer.plan_scroll(1_900.0).expect("plan");
    assert_eq!((plan.offset, plan.limit), (80, 40));

    let shrunk = &all[..100];
    buffer.apply_fetch(&plan, serve(shrunk, &plan), 100);
    assert_eq!(buffer.count(), 100);
    assert_eq!(buffer.end(), 100);
    assert!(buffer.is_consistent());
}

#[test]
fn window_stays_contained_over_a_scroll_sequence() {
    let all = numbered_records(1000);
    let mut buffer = buffer_over(&all, 80);
    for scroll_top in [500.0, 4_000.0, 3_900.0, 32_000.0, 33_000.0, 0.0, 12_345.0, 11_000.0] {
        if let Some(plan) = buffer.plan_scroll(scroll_top) {
            buffer.apply_fetch(&plan, serve(&all, &plan), all.len());
        }
        buffer.recompute_visible();
        assert!(buffer.is_consistent(), "inconsistent after {scroll_top}");
        assert_contiguous(&buffer);
    }
}

#[test]
fn recompute_reports_changes_only_once() {
    let all = numbered_records(1000);
    let mut buffer = buffer_over(&all, 80);
    buffer.set_scroll_top(330.0);
    assert!(buffer.recompute_visible());
    assert!(!buffer.recompute_visible());
}

#[test]
fn replace_clamps_rows_to_count() {
    let all = numbered_records(50);
    let mut buffer = RowBuffer::new(&GridConfig::default());
    buffer.replace(all.clone(), 0, 30);
    assert_eq!(buffer.limit(), 30);
    assert!(buffer.touches_end());
    buffer.clear();
    assert_eq!(buffer.phase(), BufferPhase::Empty);
    assert_eq!((buffer.start(), buffer.limit(), buffer.count()), (0, 0, 0));
}

#[test]
fn negative_count_adjustment_never_drops_below_buffered_end() {
    let all = numbered_records(10);
    let mut buffer = RowBuffer::new(&GridConfig::default());
    buffer.replace(all, 0, 10);
    buffer.adjust_count(-1);
    assert_eq!(buffer.count(), 10);
    assert!(buffer.is_consistent());
}
