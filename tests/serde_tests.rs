#![cfg(feature = "serde")]
//! Serde round-trips: both containers serialize as plain ordered sequences.

use rstest::rstest;
use seqlist::sequence::{ArraySequence, ChainSequence, Sequence};

#[rstest]
fn test_array_serializes_as_ordered_sequence() {
    let sequence: ArraySequence<i32> = (1..=3).collect();
    let json = serde_json::to_string(&sequence).unwrap();
    assert_eq!(json, "[1,2,3]");
}

#[rstest]
fn test_array_round_trip() {
    let original: ArraySequence<String> =
        vec!["a".to_string(), "b".to_string()].into_iter().collect();
    let json = serde_json::to_string(&original).unwrap();
    let decoded: ArraySequence<String> = serde_json::from_str(&json).unwrap();
    assert_eq!(original, decoded);
}

#[rstest]
fn test_chain_serializes_in_logical_order() {
    let mut chain = ChainSequence::new();
    chain.push_back(2);
    chain.push_front(1);
    chain.push_back(3);
    let json = serde_json::to_string(&chain).unwrap();
    assert_eq!(json, "[1,2,3]");
}

#[rstest]
fn test_chain_round_trip() {
    let original: ChainSequence<i32> = (1..=10).collect();
    let json = serde_json::to_string(&original).unwrap();
    let decoded: ChainSequence<i32> = serde_json::from_str(&json).unwrap();
    assert_eq!(original, decoded);
}

#[rstest]
fn test_empty_round_trip() {
    let empty: ArraySequence<i32> = ArraySequence::new();
    let json = serde_json::to_string(&empty).unwrap();
    assert_eq!(json, "[]");
    let decoded: ArraySequence<i32> = serde_json::from_str(&json).unwrap();
    assert!(decoded.is_empty());
}

#[rstest]
fn test_cross_backend_wire_compatibility() {
    // The wire format is backend-agnostic: an array payload loads into a
    // chain and vice versa.
    let sequence: ArraySequence<i32> = (1..=5).collect();
    let json = serde_json::to_string(&sequence).unwrap();
    let chain: ChainSequence<i32> = serde_json::from_str(&json).unwrap();
    assert_eq!(chain.to_vec().unwrap(), vec![1, 2, 3, 4, 5]);
}
