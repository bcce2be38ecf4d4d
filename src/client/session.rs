use crate::client::reconciler::Reconciler;
use crate::client::storage::{LocalStorage, Profile};
use crate::models::{Mode, TallyState};
use crate::store::VoteStore;
use crate::tasks::poller::{spawn_poller, PollHandle, Revalidator};
use log::debug;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A participant's live connection: the poller, the reconciler fed by it, and
/// the stored profile.
pub struct Session {
    pub profile: Profile,
    pub reconciler: Arc<Reconciler>,
    poll: PollHandle,
    watcher: JoinHandle<()>,
}

impl Session {
    pub fn start(
        store: Arc<dyn VoteStore>,
        storage: Arc<dyn LocalStorage>,
        poll_interval: Duration,
        debounce: Duration,
    ) -> io::Result<Self> {
        let profile = Profile::load(Arc::clone(&storage))?;
        let revalidator = Revalidator::default();
        let poll = spawn_poller(Arc::clone(&store), poll_interval, revalidator.clone());
        let reconciler = Arc::new(Reconciler::new(
            store,
            storage,
            revalidator,
            profile.user_id.clone(),
            Mode::default(),
            debounce,
        ));
        let watcher = spawn_reset_watch(Arc::clone(&reconciler), poll.subscribe());

        Ok(Self {
            profile,
            reconciler,
            poll,
            watcher,
        })
    }

    pub fn updates(&self) -> watch::Receiver<Option<TallyState>> {
        self.poll.subscribe()
    }

    pub fn latest(&self) -> Option<TallyState> {
        self.poll.latest()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

/// Forwards every polled state to the reconciler until the poller goes away.
pub fn spawn_reset_watch(
    reconciler: Arc<Reconciler>,
    mut updates: watch::Receiver<Option<TallyState>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            if let Some(state) = state {
                reconciler.observe(&state);
            }
        }
        debug!("Poller closed, reset watch exiting");
    })
}
