//! Range view behavior: forwarding, offset composition, and propagation.

use rstest::rstest;
use seqlist::SequenceError;
use seqlist::sequence::{ArraySequence, Sequence, SplitCursor};

fn is_concurrent_change<T>(result: Result<T, SequenceError>) -> bool {
    matches!(
        result,
        Err(SequenceError::ConcurrentStructuralChange { .. })
    )
}

// =============================================================================
// Forwarding
// =============================================================================

#[rstest]
fn test_view_remove_shrinks_view_and_root() {
    let sequence: ArraySequence<i32> = (0..5).collect();
    let mut view = sequence.sub_range(1, 4).unwrap();
    assert_eq!(view.to_vec().unwrap(), vec![1, 2, 3]);

    assert_eq!(view.remove_at(0).unwrap(), 1);
    assert_eq!(view.len(), 2);
    assert_eq!(sequence.len(), 4);
    // The root element formerly at index 2 now sits at index 1.
    assert_eq!(sequence.get(1).unwrap(), 2);
}

#[rstest]
fn test_view_append_inserts_at_window_end() {
    let sequence: ArraySequence<i32> = (0..4).collect();
    let mut view = sequence.sub_range(1, 3).unwrap();
    view.append(9).unwrap();
    assert_eq!(view.to_vec().unwrap(), vec![1, 2, 9]);
    assert_eq!(sequence.to_vec().unwrap(), vec![0, 1, 2, 9, 3]);
}

#[rstest]
fn test_view_append_all_splices_at_window_end() {
    let sequence: ArraySequence<i32> = (0..4).collect();
    let mut view = sequence.sub_range(1, 3).unwrap();
    assert!(view.append_all(vec![8, 9]).unwrap());
    assert_eq!(view.to_vec().unwrap(), vec![1, 2, 8, 9]);
    assert_eq!(sequence.to_vec().unwrap(), vec![0, 1, 2, 8, 9, 3]);
    // An empty splice is a no-op and keeps the view valid.
    assert!(!view.append_all(Vec::new()).unwrap());
    assert_eq!(view.len(), 4);
}

#[rstest]
fn test_view_clear_removes_window_from_root() {
    let sequence: ArraySequence<i32> = (0..6).collect();
    let mut view = sequence.sub_range(2, 5).unwrap();
    view.clear().unwrap();
    assert_eq!(view.len(), 0);
    assert_eq!(sequence.to_vec().unwrap(), vec![0, 1, 5]);
}

#[rstest]
fn test_view_remove_value_within_window() {
    let sequence: ArraySequence<i32> = vec![7, 1, 7, 2].into_iter().collect();
    let mut view = sequence.sub_range(1, 4).unwrap();
    assert!(view.remove_value(&7).unwrap());
    assert_eq!(sequence.to_vec().unwrap(), vec![7, 1, 2]);
    // The front 7 sits outside the window and is invisible to the view.
    assert!(!view.remove_value(&7).unwrap());
}

// =============================================================================
// Nesting
// =============================================================================

#[rstest]
fn test_nested_views_compose_offsets_additively() {
    let sequence: ArraySequence<i32> = (0..12).collect();
    let outer = sequence.sub_range(2, 10).unwrap();
    let middle = outer.sub_range(2, 7).unwrap();
    let inner = middle.sub_range(1, 3).unwrap();
    assert_eq!(inner.to_vec().unwrap(), vec![5, 6]);
}

#[rstest]
fn test_grandchild_edit_visible_to_whole_lineage() {
    let sequence: ArraySequence<i32> = (0..12).collect();
    let outer = sequence.sub_range(2, 10).unwrap();
    let middle = outer.sub_range(2, 7).unwrap();
    let mut inner = middle.sub_range(1, 3).unwrap();

    inner.insert(0, 99).unwrap();

    assert_eq!(inner.to_vec().unwrap(), vec![99, 5, 6]);
    assert_eq!(middle.len(), 6);
    assert_eq!(outer.len(), 9);
    assert_eq!(sequence.len(), 13);
    assert_eq!(sequence.get(5).unwrap(), 99);
}

#[rstest]
fn test_edit_through_parent_fails_child_but_not_parent() {
    let sequence: ArraySequence<i32> = (0..8).collect();
    let mut outer = sequence.sub_range(1, 7).unwrap();
    let inner = outer.sub_range(1, 4).unwrap();

    outer.remove_at(5).unwrap();

    assert_eq!(outer.to_vec().unwrap(), vec![1, 2, 3, 4, 5]);
    assert!(is_concurrent_change(inner.to_vec()));
}

// =============================================================================
// Staleness
// =============================================================================

#[rstest]
fn test_every_view_operation_validates() {
    let mut sequence: ArraySequence<i32> = (0..5).collect();
    let mut view = sequence.sub_range(1, 4).unwrap();
    sequence.append(5).unwrap();

    assert!(is_concurrent_change(view.get(0)));
    assert!(is_concurrent_change(view.set(0, 9)));
    assert!(is_concurrent_change(view.insert(0, 9)));
    assert!(is_concurrent_change(view.remove_at(0)));
    assert!(is_concurrent_change(view.index_of(&1)));
    assert!(is_concurrent_change(view.to_vec()));
    assert!(is_concurrent_change(view.clear()));
    assert!(is_concurrent_change(view.sub_range(0, 1)));
}

#[rstest]
fn test_capacity_growth_does_not_invalidate_views() {
    let mut sequence: ArraySequence<i32> = (0..5).collect();
    let view = sequence.sub_range(1, 4).unwrap();
    sequence.reserve(1000).unwrap();
    sequence.trim_to_capacity();
    assert_eq!(view.to_vec().unwrap(), vec![1, 2, 3]);
}

// =============================================================================
// Cursors and Split Cursors over Views
// =============================================================================

#[rstest]
fn test_view_cursor_round_trip() {
    let sequence: ArraySequence<i32> = (0..6).collect();
    let view = sequence.sub_range(2, 5).unwrap();
    let mut cursor = view.cursor_at(3).unwrap();
    assert_eq!(cursor.retreat().unwrap(), 4);
    assert_eq!(cursor.retreat().unwrap(), 3);
    assert_eq!(cursor.advance().unwrap(), 3);
}

#[rstest]
fn test_view_split_cursor_partitions_window() {
    let sequence: ArraySequence<i32> = (0..10).collect();
    let view = sequence.sub_range(2, 8).unwrap();
    let mut right = view.split_cursor();
    let mut left = right.try_split().expect("splittable");

    let mut visited = Vec::new();
    left.for_each_remaining(|element| visited.push(element))
        .unwrap();
    right
        .for_each_remaining(|element| visited.push(element))
        .unwrap();
    assert_eq!(visited, vec![2, 3, 4, 5, 6, 7]);
}
