//! Registry semantics: replace-by-id, queries and listener fan-out.
mod common;

use common::linked_definition;
use flowdeck::definition::{DefinitionRegistry, RegistryEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn register_is_idempotent_by_id_and_latest_wins() {
    let registry = DefinitionRegistry::new();

    registry.register(linked_definition("sync", "Data Sync"));
    assert_eq!(registry.size(), 1);

    // Same id again: size unchanged, stored value equals the latest input.
    registry.register(linked_definition("sync", "Data Sync v2"));
    assert_eq!(registry.size(), 1);
    assert_eq!(registry.get("sync").unwrap().name, "Data Sync v2");
}

#[test]
fn unregister_reports_presence() {
    let registry = DefinitionRegistry::new();
    registry.register(linked_definition("sync", "Data Sync"));

    assert!(registry.unregister("sync"));
    assert!(!registry.unregister("sync"));
    assert!(registry.get("sync").is_none());
    assert_eq!(registry.size(), 0);
}

#[test]
fn queries_cover_tags_names_and_active_flags() {
    let registry = DefinitionRegistry::new();

    let mut tagged = linked_definition("tagged", "Nightly Import");
    tagged.tags = vec!["etl".to_string(), "nightly".to_string()];
    registry.register(tagged);

    let mut inactive = linked_definition("paused", "Paused Export");
    inactive.active = false;
    registry.register(inactive);

    assert_eq!(registry.find_by_tag("etl").len(), 1);
    assert!(registry.find_by_tag("missing").is_empty());

    let found = registry.find_by_name("nightly").expect("substring match");
    assert_eq!(found.id, "tagged");
    assert!(registry.find_by_name("no such thing").is_none());

    let active = registry.get_active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, "tagged");
}

#[test]
fn failing_listener_does_not_block_other_listeners() {
    let registry = DefinitionRegistry::new();
    let delivered = Arc::new(AtomicUsize::new(0));

    registry.add_listener(Arc::new(|_event| anyhow::bail!("listener crashed")));

    let counter = Arc::clone(&delivered);
    registry.add_listener(Arc::new(move |event| {
        if let RegistryEvent::Registered(definition) = event {
            assert_eq!(definition.id, "sync");
        }
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    registry.register(linked_definition("sync", "Data Sync"));
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    assert_eq!(registry.size(), 1, "listener failure must not affect the store");
}

#[test]
fn removed_listener_stops_receiving_events() {
    let registry = DefinitionRegistry::new();
    let delivered = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&delivered);
    let id = registry.add_listener(Arc::new(move |_event| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    registry.register(linked_definition("one", "One"));
    assert!(registry.remove_listener(id));
    registry.register(linked_definition("two", "Two"));

    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    assert!(!registry.remove_listener(id));
}

#[test]
fn unregister_notifies_with_the_removed_id() {
    let registry = DefinitionRegistry::new();
    let removals = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&removals);
    registry.add_listener(Arc::new(move |event| {
        if let RegistryEvent::Removed(id) = event {
            assert_eq!(id, "sync");
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }));

    registry.register(linked_definition("sync", "Data Sync"));
    registry.unregister("sync");
    assert_eq!(removals.load(Ordering::SeqCst), 1);
}
