mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::Clock;
use ember_core::{PageStorage, StorageKey};
use ember_widgets::{ChildrenVisibility, ExpansionTile, ExpansionTileConfig, KeepAlive};

fn key(index: usize) -> StorageKey {
    StorageKey::new("inbox").child(index)
}

#[test]
fn test_state_survives_recreation() {
    let mut clock = Clock::new();
    let storage = PageStorage::new();

    let mut tile = ExpansionTile::new(
        &clock.handle(),
        storage.clone(),
        key(3),
        ExpansionTileConfig::default(),
    )
    .unwrap();
    tile.toggle().unwrap();
    clock.settle();
    assert_eq!(tile.frame().height_factor, 1.0);

    // Scrolled out of the list and back
    drop(tile);
    clock.settle();
    let restored = ExpansionTile::new(
        &clock.handle(),
        storage.clone(),
        key(3),
        ExpansionTileConfig::default(),
    )
    .unwrap();

    assert!(restored.is_expanded());
    assert_eq!(restored.controller().value(), 1.0);
    assert!(!restored.controller().is_animating());
    assert!(!restored.wants_keep_alive());
    assert_eq!(restored.frame().children, ChildrenVisibility::Visible);
    assert_eq!(restored.frame().icon_turns, 0.5);
}

#[test]
fn test_keys_are_independent() {
    let mut clock = Clock::new();
    let storage = PageStorage::new();

    let mut first =
        ExpansionTile::new(&clock.handle(), storage.clone(), key(0), ExpansionTileConfig::default())
            .unwrap();
    first.toggle().unwrap();
    clock.settle();

    let second =
        ExpansionTile::new(&clock.handle(), storage.clone(), key(1), ExpansionTileConfig::default())
            .unwrap();
    assert!(!second.is_expanded());
    assert_eq!(second.frame().children, ChildrenVisibility::Removed);
    assert_eq!(storage.len(), 1);
}

#[test]
fn test_collapse_is_persisted_and_restored() {
    let mut clock = Clock::new();
    let storage = PageStorage::new();
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = changes.clone();

    let mut tile = ExpansionTile::new(
        &clock.handle(),
        storage.clone(),
        key(7),
        ExpansionTileConfig::expanded(),
    )
    .unwrap()
    .on_expansion_changed(move |expanded| sink.borrow_mut().push(expanded));
    assert_eq!(tile.controller().value(), 1.0);

    tile.toggle().unwrap();
    clock.frame();
    clock.advance(100);
    assert!(tile.wants_keep_alive());
    assert_eq!(tile.frame().children, ChildrenVisibility::Visible);
    clock.settle();
    assert!(tile.is_closed());
    drop(tile);

    let restored = ExpansionTile::new(
        &clock.handle(),
        storage,
        key(7),
        ExpansionTileConfig::expanded(),
    )
    .unwrap();
    assert!(!restored.is_expanded());
    assert_eq!(restored.controller().value(), 0.0);
    assert_eq!(*changes.borrow(), vec![false]);
}
