//! Fail-fast detection scenarios across cursors, views, and containers.
//!
//! These tests pin the detection protocol: any structural change performed
//! *not* through a live cursor fails that cursor's next step, while a
//! cursor's own edits resynchronize it and leave it usable.

use rstest::rstest;
use seqlist::SequenceError;
use seqlist::sequence::{ArraySequence, ChainSequence, Sequence, SplitCursor};

fn is_concurrent_change<T>(result: Result<T, SequenceError>) -> bool {
    matches!(
        result,
        Err(SequenceError::ConcurrentStructuralChange { .. })
    )
}

// =============================================================================
// Array Cursor Detection
// =============================================================================

#[rstest]
fn test_array_append_fails_live_cursor_advance() {
    let mut sequence: ArraySequence<i32> = (1..=3).collect();
    let mut cursor = sequence.cursor();
    sequence.append(4).unwrap();
    assert!(is_concurrent_change(cursor.advance()));
}

#[rstest]
fn test_array_remove_fails_live_cursor_retreat() {
    let mut sequence: ArraySequence<i32> = (1..=3).collect();
    let mut cursor = sequence.cursor_at(2).unwrap();
    sequence.remove_at(0).unwrap();
    assert!(is_concurrent_change(cursor.retreat()));
}

#[rstest]
fn test_array_mutation_fails_cursor_remove_and_set() {
    let mut sequence: ArraySequence<i32> = (1..=3).collect();
    let mut cursor = sequence.cursor();
    cursor.advance().unwrap();
    sequence.append(4).unwrap();
    assert!(is_concurrent_change(cursor.remove()));
    assert!(is_concurrent_change(cursor.set(9)));
}

#[rstest]
fn test_array_remove_then_add_is_still_detected() {
    // Equal lengths do not mask the change: the generation counts
    // mutations, not states.
    let mut sequence: ArraySequence<i32> = (1..=3).collect();
    let mut cursor = sequence.cursor();
    sequence.remove_at(0).unwrap();
    sequence.insert(0, 1).unwrap();
    assert_eq!(sequence.len(), 3);
    assert!(is_concurrent_change(cursor.advance()));
}

#[rstest]
fn test_array_cursor_own_edits_resynchronize() {
    let sequence: ArraySequence<i32> = (1..=3).collect();
    let mut cursor = sequence.cursor();
    cursor.advance().unwrap();
    cursor.set(9).unwrap();
    cursor.remove().unwrap();
    cursor.insert(8).unwrap();
    assert_eq!(sequence.to_vec().unwrap(), vec![8, 2, 3]);
    assert_eq!(cursor.advance().unwrap(), 2);
}

#[rstest]
fn test_two_cursors_first_edit_wins() {
    let sequence: ArraySequence<i32> = (1..=3).collect();
    let mut first = sequence.cursor();
    let mut second = sequence.cursor();
    first.advance().unwrap();
    first.remove().unwrap();
    assert!(is_concurrent_change(second.advance()));
    assert_eq!(first.advance().unwrap(), 2);
}

#[rstest]
fn test_array_iterator_surfaces_staleness() {
    let mut sequence: ArraySequence<i32> = (1..=3).collect();
    let mut cursor = sequence.cursor();
    assert_eq!(cursor.next(), Some(Ok(1)));
    sequence.append(4).unwrap();
    assert!(matches!(
        cursor.next(),
        Some(Err(SequenceError::ConcurrentStructuralChange { .. }))
    ));
}

#[rstest]
fn test_array_for_each_remaining_detects_reentrant_mutation() {
    let mut sequence: ArraySequence<i32> = (1..=5).collect();
    let mut cursor = sequence.cursor();
    let mut visited = Vec::new();
    let result = cursor.for_each_remaining(|element| {
        visited.push(element);
        if element == 2 {
            sequence.append(9).unwrap();
        }
    });
    // The relaxed protocol stops the loop and reports at the end.
    assert!(is_concurrent_change(result));
    assert_eq!(visited, vec![1, 2]);
}

// =============================================================================
// Chain Cursor Detection
// =============================================================================

#[rstest]
fn test_chain_push_fails_live_cursor() {
    let mut chain: ChainSequence<i32> = (1..=3).collect();
    let mut cursor = chain.cursor();
    chain.push_front(0);
    assert!(is_concurrent_change(cursor.advance()));
}

#[rstest]
fn test_chain_pop_fails_live_cursor() {
    let mut chain: ChainSequence<i32> = (1..=3).collect();
    let mut cursor = chain.cursor_at(3).unwrap();
    chain.pop_back().unwrap();
    assert!(is_concurrent_change(cursor.retreat()));
}

#[rstest]
fn test_chain_cursor_own_edits_resynchronize() {
    let chain: ChainSequence<i32> = (1..=3).collect();
    let mut cursor = chain.cursor();
    cursor.advance().unwrap();
    cursor.remove().unwrap();
    cursor.insert(7).unwrap();
    assert_eq!(chain.to_vec().unwrap(), vec![7, 2, 3]);
    assert_eq!(cursor.advance().unwrap(), 2);
}

#[rstest]
fn test_chain_deque_aliases_bump_like_primitives() {
    let mut chain: ChainSequence<i32> = (1..=3).collect();
    let mut cursor = chain.cursor();
    assert_eq!(chain.poll(), Some(1));
    assert!(is_concurrent_change(cursor.advance()));
}

// =============================================================================
// Illegal Cursor States
// =============================================================================

#[rstest]
fn test_set_and_remove_require_positional_move() {
    let sequence: ArraySequence<i32> = (1..=3).collect();
    let mut cursor = sequence.cursor();
    assert_eq!(cursor.set(9), Err(SequenceError::IllegalIteratorState));
    assert_eq!(cursor.remove(), Err(SequenceError::IllegalIteratorState));

    let chain: ChainSequence<i32> = (1..=3).collect();
    let mut chain_cursor = chain.cursor();
    assert_eq!(chain_cursor.set(9), Err(SequenceError::IllegalIteratorState));
    assert_eq!(
        chain_cursor.remove(),
        Err(SequenceError::IllegalIteratorState)
    );
}

#[rstest]
fn test_insert_invalidates_last_returned_anchor() {
    let sequence: ArraySequence<i32> = (1..=3).collect();
    let mut cursor = sequence.cursor();
    cursor.advance().unwrap();
    cursor.insert(9).unwrap();
    // insert clears the anchor, so set/remove need a fresh move first.
    assert_eq!(cursor.set(0), Err(SequenceError::IllegalIteratorState));
}

// =============================================================================
// Split Cursor Detection
// =============================================================================

#[rstest]
fn test_split_cursor_post_binding_detection() {
    let mut sequence: ArraySequence<i32> = (0..4).collect();
    let mut cursor = sequence.split_cursor();
    assert!(cursor.try_advance(|_| {}).unwrap());
    sequence.remove_at(0).unwrap();
    assert!(is_concurrent_change(cursor.try_advance(|_| {})));
}

#[rstest]
fn test_chain_split_cursor_refuses_split_when_stale() {
    let mut chain: ChainSequence<i32> = (0..10).collect();
    let mut cursor = chain.split_cursor();
    assert_eq!(cursor.estimate_remaining(), 10);
    chain.push_back(10);
    assert!(cursor.try_split().is_none());
    assert!(is_concurrent_change(cursor.try_advance(|_| {})));
}
