//! In-memory [`VoteStore`] that records every mutation, for unit tests.

use crate::error::StoreError;
use crate::models::{HistorySnapshot, Item, ItemId, Mode, TallyState};
use crate::store::VoteStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Call {
    Vote { item_id: ItemId, user_id: String, user_name: String },
    Unvote { item_id: ItemId, user_id: String },
    SetMode(Mode),
    Reset,
    Relabel { item_id: ItemId, label: String },
    Finalize,
    DeleteHistory(i64),
}

pub struct MockStore {
    state: Mutex<TallyState>,
    calls: Mutex<Vec<Call>>,
    fetches: AtomicUsize,
    fetch_failing: AtomicBool,
    mutations_failing: AtomicBool,
}

impl MockStore {
    pub fn with_items(items: &[(&str, i64)]) -> Self {
        let items = items
            .iter()
            .enumerate()
            .map(|(i, (label, count))| Item {
                id: i as ItemId + 1,
                label: label.to_string(),
                count: *count,
            })
            .collect();

        Self {
            state: Mutex::new(TallyState {
                items,
                mode: Mode::Multiple,
            }),
            calls: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            fetch_failing: AtomicBool::new(false),
            mutations_failing: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn set_fetch_failing(&self, failing: bool) {
        self.fetch_failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_mutations_failing(&self, failing: bool) {
        self.mutations_failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_count(&self, item_id: ItemId, count: i64) {
        let mut state = self.state.lock().unwrap();
        if let Some(item) = state.items.iter_mut().find(|item| item.id == item_id) {
            item.count = count;
        }
    }

    pub fn set_mode_directly(&self, mode: Mode) {
        self.state.lock().unwrap().mode = mode;
    }

    pub fn snapshot(&self) -> TallyState {
        self.state.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(call);
        if self.mutations_failing.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VoteStore for MockStore {
    async fn fetch_state(&self) -> Result<TallyState, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fetch_failing.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 500,
                message: "database is down".to_string(),
            });
        }
        Ok(self.snapshot())
    }

    async fn cast_vote(&self, user_id: &str, item_id: ItemId, user_name: &str) -> Result<(), StoreError> {
        self.record(Call::Vote {
            item_id,
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
        })
    }

    async fn retract_vote(&self, user_id: &str, item_id: ItemId) -> Result<(), StoreError> {
        self.record(Call::Unvote {
            item_id,
            user_id: user_id.to_string(),
        })
    }

    async fn set_mode(&self, mode: Mode) -> Result<(), StoreError> {
        self.record(Call::SetMode(mode))?;
        let mut state = self.state.lock().unwrap();
        state.mode = mode;
        state.items.iter_mut().for_each(|item| item.count = 0);
        Ok(())
    }

    async fn reset_all(&self) -> Result<(), StoreError> {
        self.record(Call::Reset)?;
        self.state.lock().unwrap().items.iter_mut().for_each(|item| item.count = 0);
        Ok(())
    }

    async fn relabel(&self, item_id: ItemId, label: &str) -> Result<(), StoreError> {
        self.record(Call::Relabel {
            item_id,
            label: label.to_string(),
        })?;
        let mut state = self.state.lock().unwrap();
        match state.items.iter_mut().find(|item| item.id == item_id) {
            Some(item) => {
                item.label = label.to_string();
                Ok(())
            }
            None => Err(StoreError::UnknownItem(item_id)),
        }
    }

    async fn finalize_round(&self) -> Result<HistorySnapshot, StoreError> {
        self.record(Call::Finalize)?;
        Ok(HistorySnapshot {
            id: 1,
            created_at: Utc::now(),
            result_data: Vec::new(),
        })
    }

    async fn list_history(&self) -> Result<Vec<HistorySnapshot>, StoreError> {
        Ok(Vec::new())
    }

    async fn delete_history(&self, id: i64) -> Result<(), StoreError> {
        self.record(Call::DeleteHistory(id))
    }
}
