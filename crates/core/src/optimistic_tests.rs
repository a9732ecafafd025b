// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::clock::ManualClock;
use serde_json::json;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: &'static str,
    value: i64,
}

fn initial() -> Vec<Item> {
    vec![Item { id: "1", value: 10 }, Item { id: "2", value: 20 }]
}

fn set_value(id: &'static str, value: i64) -> impl FnOnce(&Vec<Item>) -> Vec<Item> {
    move |items: &Vec<Item>| {
        items
            .iter()
            .map(|item| if item.id == id { Item { id: item.id, value } } else { item.clone() })
            .collect()
    }
}

fn store() -> OptimisticStore<Vec<Item>, ManualClock> {
    OptimisticStore::with_clock(initial(), ManualClock::new(1_000))
}

#[test]
fn update_applies_immediately_and_tracks_pending() {
    let mut store = store();

    store.update_optimistic("update-1", set_value("1", 100), None);

    assert_eq!(store.state()[0].value, 100);
    assert!(store.has_pending_updates());
    assert_eq!(store.pending_count(), 1);

    let pending = store.pending_update("update-1").unwrap();
    assert_eq!(pending.previous_state[0].value, 10);
    assert_eq!(pending.optimistic_state[0].value, 100);
    assert_eq!(pending.timestamp, 1_000);
}

#[test]
fn noop_updater_still_registers_pending() {
    let mut store = store();

    store.update_optimistic("update-1", |items: &Vec<Item>| items.clone(), None);
    store.update_optimistic("update-2", |items: &Vec<Item>| items.clone(), None);
    store.update_optimistic("update-3", |items: &Vec<Item>| items.clone(), None);

    assert_eq!(store.state(), &initial());
    assert_eq!(store.pending_count(), 3);

    assert!(store.commit_optimistic("update-1"));
    assert_eq!(store.pending_count(), 2);
}

#[test]
fn rollback_restores_state_before_update() {
    let mut store = store();
    store.update_optimistic("update-1", set_value("1", 100), None);

    assert!(store.rollback_optimistic("update-1", None));

    assert_eq!(store.state(), &initial());
    assert!(!store.has_pending_updates());
}

#[test]
fn rollback_after_commit_is_noop() {
    let mut store = store();
    store.update_optimistic("update-1", set_value("1", 100), None);

    assert!(store.commit_optimistic("update-1"));
    assert!(!store.rollback_optimistic("update-1", None));

    assert_eq!(store.state()[0].value, 100);
}

#[test]
fn commit_and_rollback_unknown_ids_are_noops() {
    let mut store = store();
    assert!(!store.commit_optimistic("missing"));
    assert!(!store.rollback_optimistic("missing", Some(Vec::new())));
    assert_eq!(store.state(), &initial());
}

#[test]
fn rollback_with_fallback_state() {
    let mut store = store();
    store.update_optimistic("update-1", set_value("1", 100), None);

    let fallback = vec![Item { id: "1", value: 999 }];
    store.rollback_optimistic("update-1", Some(fallback.clone()));

    assert_eq!(store.state(), &fallback);
}

#[test]
fn rollback_restores_recorded_snapshot_not_current_state() {
    let mut store = store();
    store.update_optimistic("update-1", set_value("1", 100), None);
    store.update_optimistic("update-2", set_value("2", 200), None);

    // Rolling back the second update restores the snapshot it captured,
    // which already contains update-1.
    store.rollback_optimistic("update-2", None);

    assert_eq!(store.state()[0].value, 100);
    assert_eq!(store.state()[1].value, 20);
    assert_eq!(store.pending_count(), 1);
}

#[test]
fn rollback_all_restores_oldest_snapshot() {
    let mut store = store();
    store.update_optimistic("update-1", set_value("1", 100), None);
    store.update_optimistic("update-2", set_value("2", 200), None);

    assert_eq!(store.rollback_all(), 2);

    assert_eq!(store.state(), &initial());
    assert_eq!(store.pending_count(), 0);
    assert_eq!(store.rollback_all(), 0);
}

#[test]
fn batch_applies_sequentially() {
    let mut store = store();

    store.batch_update(vec![
        BatchUpdate::new("batch-1", |items: &Vec<Item>| {
            items.iter().map(|i| Item { value: i.value * 2, ..i.clone() }).collect()
        }),
        BatchUpdate::new("batch-2", |items: &Vec<Item>| {
            items.iter().map(|i| Item { value: i.value + 10, ..i.clone() }).collect()
        }),
    ]);

    // 10 * 2 + 10
    assert_eq!(store.state()[0].value, 30);
    assert_eq!(store.pending_count(), 2);
}

#[test]
fn batch_entries_share_pre_batch_snapshot() {
    let mut store = store();

    store.batch_update(vec![
        BatchUpdate::new("batch-1", set_value("1", 100)),
        BatchUpdate::new("batch-2", set_value("2", 200)),
    ]);

    let first = store.pending_update("batch-1").unwrap();
    let second = store.pending_update("batch-2").unwrap();
    assert!(Arc::ptr_eq(&first.previous_state, &second.previous_state));

    // Rolling back the last entry goes to the pre-batch state, not the
    // intermediate state after batch-1.
    store.rollback_optimistic("batch-2", None);
    assert_eq!(store.state(), &initial());
}

#[test]
fn rollback_all_after_batch_restores_shared_snapshot() {
    let mut store = store();
    store.batch_update(vec![
        BatchUpdate::new("batch-1", set_value("1", 100)),
        BatchUpdate::new("batch-2", set_value("2", 200)),
    ]);

    store.rollback_all();

    assert_eq!(store.state(), &initial());
}

#[test]
fn batch_metadata_is_recorded() {
    let mut store = store();
    store.batch_update(vec![BatchUpdate::new("batch-1", set_value("1", 100))
        .with_metadata(json!({"source": "batch", "priority": "high"}))]);

    let pending = store.pending_update("batch-1").unwrap();
    assert_eq!(pending.metadata, Some(json!({"source": "batch", "priority": "high"})));
}

#[test]
fn reused_id_overwrites_in_place() {
    let mut store = store();
    store.update_optimistic("a", set_value("1", 100), None);
    store.update_optimistic("b", set_value("2", 200), None);
    store.update_optimistic("a", set_value("1", 300), None);

    let ids: Vec<&str> = store.update_queue().iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(store.pending_update("a").unwrap().previous_state[0].value, 100);
}

#[test]
fn listeners_see_commit_and_rollback() {
    let mut store = store();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store.subscribe(move |event| {
        let entry = match event {
            StoreEvent::Committed(u) => format!("commit:{}", u.id),
            StoreEvent::RolledBack(u) => format!("rollback:{}", u.id),
        };
        sink.lock().unwrap().push(entry);
    });

    store.update_optimistic("a", set_value("1", 100), None);
    store.update_optimistic("b", set_value("2", 200), None);
    store.update_optimistic("c", set_value("2", 300), None);
    store.commit_optimistic("a");
    store.rollback_optimistic("b", None);
    store.rollback_all();

    assert_eq!(*seen.lock().unwrap(), vec!["commit:a", "rollback:b", "rollback:c"]);
}
