use crate::error::StoreError;
use crate::models::{HistorySnapshot, ItemId, Mode, TallyState};
use async_trait::async_trait;

/// The request/response contract every front-end talks to. Implemented by the
/// SQLite [`Database`](crate::db::Database) on the server and by
/// [`HttpStore`](crate::client::http_store::HttpStore) in the consoles.
#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn fetch_state(&self) -> Result<TallyState, StoreError>;

    /// Upsert: a repeated vote only refreshes the stored user name.
    async fn cast_vote(&self, user_id: &str, item_id: ItemId, user_name: &str) -> Result<(), StoreError>;

    /// Idempotent; retracting a vote that does not exist is not an error.
    async fn retract_vote(&self, user_id: &str, item_id: ItemId) -> Result<(), StoreError>;

    /// Destructive: clears every vote along with the mode change.
    async fn set_mode(&self, mode: Mode) -> Result<(), StoreError>;

    async fn reset_all(&self) -> Result<(), StoreError>;

    async fn relabel(&self, item_id: ItemId, label: &str) -> Result<(), StoreError>;

    /// Snapshots the current tally into history and clears the votes.
    async fn finalize_round(&self) -> Result<HistorySnapshot, StoreError>;

    async fn list_history(&self) -> Result<Vec<HistorySnapshot>, StoreError>;

    async fn delete_history(&self, id: i64) -> Result<(), StoreError>;
}
