//! Optimistic vote toggling with per-item debounced writes.
//!
//! The local selection is this session's *intent* and is updated the moment
//! the user toggles. Counts shown anywhere come from the server. A toggle
//! (re)starts a timer for every item whose server-side vote may change; when a
//! timer fires it sends whatever the selection says *now*, so a burst of
//! toggles collapses into one request or none.

use crate::client::selection::{affected_items, compute_next_selection};
use crate::client::storage::{load_selection, save_selection, LocalStorage, SELECTION_KEY};
use crate::error::ClientError;
use crate::models::{ItemId, Mode, TallyState};
use crate::store::VoteStore;
use crate::tasks::poller::Revalidator;
use log::{debug, error, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

// Consecutive zero-total polls with no write outstanding before a leftover
// selection is treated as stale.
const SETTLE_POLLS: u32 = 2;

struct PendingWrite {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    selection: BTreeSet<ItemId>,
    pending: HashMap<ItemId, PendingWrite>,
    mode: Mode,
    next_generation: u64,
    last_total: Option<i64>,
    in_flight: usize,
    quiet_polls: u32,
}

pub struct Reconciler {
    inner: Arc<Mutex<Inner>>,
    store: Arc<dyn VoteStore>,
    storage: Arc<dyn LocalStorage>,
    revalidator: Revalidator,
    user_id: String,
    debounce: Duration,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Reconciler {
    /// Restores the selection persisted by an earlier session. The mode is a
    /// guess until the first [`observe`](Self::observe).
    pub fn new(
        store: Arc<dyn VoteStore>,
        storage: Arc<dyn LocalStorage>,
        revalidator: Revalidator,
        user_id: impl Into<String>,
        mode: Mode,
        debounce: Duration,
    ) -> Self {
        let selection = load_selection(storage.as_ref());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                selection,
                pending: HashMap::new(),
                mode,
                next_generation: 0,
                last_total: None,
                in_flight: 0,
                quiet_polls: 0,
            })),
            store,
            storage,
            revalidator,
            user_id: user_id.into(),
            debounce,
        }
    }

    pub fn selection(&self) -> BTreeSet<ItemId> {
        lock(&self.inner).selection.clone()
    }

    pub fn mode(&self) -> Mode {
        lock(&self.inner).mode
    }

    pub fn pending_items(&self) -> BTreeSet<ItemId> {
        lock(&self.inner).pending.keys().copied().collect()
    }

    /// Flips `item_id` locally right away and schedules the matching network
    /// writes. Returns the new selection.
    pub fn toggle(&self, item_id: ItemId, user_name: &str) -> Result<BTreeSet<ItemId>, ClientError> {
        let user_name = user_name.trim();
        if user_name.is_empty() {
            return Err(ClientError::MissingName);
        }

        let mut inner = lock(&self.inner);
        let previous = inner.selection.clone();
        let next = compute_next_selection(inner.mode, &previous, item_id);

        inner.selection = next.clone();
        inner.quiet_polls = 0;
        if let Err(e) = save_selection(self.storage.as_ref(), &next) {
            error!("Failed to persist selection: {}", e);
        }

        for affected in affected_items(inner.mode, &previous, item_id) {
            self.schedule(&mut inner, affected, user_name);
        }

        debug!("Toggled item {}: {:?} -> {:?}", item_id, previous, next);
        Ok(next)
    }

    // Replace any pending write for `item_id` with a fresh timer.
    fn schedule(&self, inner: &mut Inner, item_id: ItemId, user_name: &str) {
        if let Some(stale) = inner.pending.remove(&item_id) {
            stale.handle.abort();
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;

        let shared = Arc::clone(&self.inner);
        let store = Arc::clone(&self.store);
        let revalidator = self.revalidator.clone();
        let user_id = self.user_id.clone();
        let user_name = user_name.to_string();
        let delay = self.debounce;

        // The spawned task cannot take the lock before we insert its entry,
        // because we are holding it.
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let selected = {
                let mut inner = lock(&shared);
                match inner.pending.get(&item_id) {
                    Some(pending) if pending.generation == generation => {
                        // Once fired the write is no longer cancellable
                        inner.pending.remove(&item_id);
                        inner.in_flight += 1;
                    }
                    _ => return,
                }
                inner.selection.contains(&item_id)
            };

            let result = if selected {
                store.cast_vote(&user_id, item_id, &user_name).await
            } else {
                store.retract_vote(&user_id, item_id).await
            };

            match result {
                Ok(()) => debug!("Sent {} for item {}", if selected { "vote" } else { "unvote" }, item_id),
                Err(e) => error!(
                    "Failed to send {} for item {}: {}",
                    if selected { "vote" } else { "unvote" },
                    item_id,
                    e
                ),
            }
            {
                let mut inner = lock(&shared);
                inner.in_flight = inner.in_flight.saturating_sub(1);
                inner.quiet_polls = 0;
            }
            revalidator.revalidate();
        });

        inner.pending.insert(item_id, PendingWrite { generation, handle });
    }

    /// Feeds a polled state into the machine.
    ///
    /// Adopts the server's mode. The local selection and its stored copy are
    /// wiped, and pending writes cancelled so they cannot resurrect a vote,
    /// when any of these hold:
    ///
    /// - the tally drops to zero (an admin reset or finalize);
    /// - the mode changes, which clears votes server-side;
    /// - the mode is single but the selection holds more than one item;
    /// - the tally has stayed at zero for a couple of polls with no
    ///   write outstanding, so a selection whose write failed does not linger.
    pub fn observe(&self, state: &TallyState) {
        let mut inner = lock(&self.inner);
        let total = state.total_votes();
        let previous_total = inner.last_total.replace(total);
        let mode_changed = previous_total.is_some() && inner.mode != state.mode;
        inner.mode = state.mode;

        if inner.pending.is_empty() && inner.in_flight == 0 {
            inner.quiet_polls = inner.quiet_polls.saturating_add(1);
        } else {
            inner.quiet_polls = 0;
        }

        let dropped_to_zero = total == 0 && previous_total.map_or(true, |t| t > 0);
        let settled_at_zero = total == 0 && inner.quiet_polls >= SETTLE_POLLS && !inner.selection.is_empty();
        let too_many_for_single = state.mode == Mode::Single && inner.selection.len() > 1;
        if !dropped_to_zero && !mode_changed && !settled_at_zero && !too_many_for_single {
            return;
        }

        let cancelled = inner.pending.len();
        for (_, pending) in inner.pending.drain() {
            pending.handle.abort();
        }
        if !inner.selection.is_empty() || cancelled > 0 {
            info!(
                "Server votes were cleared; dropping local selection {:?} and {} pending write(s)",
                inner.selection, cancelled
            );
        }
        inner.selection.clear();
        if let Err(e) = self.storage.remove(SELECTION_KEY) {
            warn!("Failed to clear stored selection: {}", e);
        }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        for (_, pending) in lock(&self.inner).pending.drain() {
            pending.handle.abort();
        }
    }
}
