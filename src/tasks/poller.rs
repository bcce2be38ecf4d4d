use crate::models::TallyState;
use crate::store::VoteStore;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Asks the poller for an immediate re-fetch. Cheap to clone; requests made
/// while no poller is listening are kept until one is.
#[derive(Clone, Default)]
pub struct Revalidator {
    notify: Arc<Notify>,
}

impl Revalidator {
    pub fn revalidate(&self) {
        self.notify.notify_one();
    }

    /// Resolves once a revalidation has been requested.
    pub async fn requested(&self) {
        self.notify.notified().await;
    }
}

/// The latest fetched state, `None` until the first fetch succeeds.
pub struct PollHandle {
    updates: watch::Receiver<Option<TallyState>>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn subscribe(&self) -> watch::Receiver<Option<TallyState>> {
        self.updates.clone()
    }

    pub fn latest(&self) -> Option<TallyState> {
        self.updates.borrow().clone()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Starts fetching `store` every `period` and whenever `revalidator` fires.
///
/// Each fetch runs in its own task and publishes when it lands, so a manual
/// revalidation never waits behind a slow scheduled poll. Whichever response
/// arrives last wins. Failures keep the previous value.
pub fn spawn_poller(store: Arc<dyn VoteStore>, period: Duration, revalidator: Revalidator) -> PollHandle {
    let (tx, updates) = watch::channel(None);
    let tx = Arc::new(tx);

    let task = tokio::spawn(async move {
        info!("Polling vote state every {:?}", period);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {},
                _ = revalidator.requested() => debug!("Revalidation requested"),
            }

            let store = Arc::clone(&store);
            let tx = Arc::clone(&tx);
            tokio::spawn(async move {
                match store.fetch_state().await {
                    Ok(state) => {
                        tx.send_replace(Some(state));
                    }
                    Err(e) => warn!("Failed to fetch vote state, keeping last known: {}", e),
                }
            });
        }
    });

    PollHandle { updates, task }
}
