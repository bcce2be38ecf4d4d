use crate::models::{ItemId, Mode};
use std::collections::BTreeSet;

/// The selection that results from toggling `item_id`.
///
/// In single mode picking a new item replaces the old one and picking the
/// selected item clears it; in multiple mode only `item_id` changes.
pub fn compute_next_selection(mode: Mode, previous: &BTreeSet<ItemId>, item_id: ItemId) -> BTreeSet<ItemId> {
    match mode {
        Mode::Single => {
            if previous.contains(&item_id) {
                BTreeSet::new()
            } else {
                BTreeSet::from([item_id])
            }
        }
        Mode::Multiple => {
            let mut next = previous.clone();
            if !next.remove(&item_id) {
                next.insert(item_id);
            }
            next
        }
    }
}

/// Items whose server-side vote may change because of the toggle. In single
/// mode that includes whatever was selected before, since switching implicitly
/// deselects it.
pub fn affected_items(mode: Mode, previous: &BTreeSet<ItemId>, item_id: ItemId) -> BTreeSet<ItemId> {
    let mut affected = BTreeSet::from([item_id]);
    if mode == Mode::Single {
        affected.extend(previous.iter().copied());
    }
    affected
}
