use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use event_emitter_rs::EventEmitter;
use tracing::{debug, error, warn};

use super::{DispatchOutcome, FeedEntry, Notice, NOTICE_EVENT};
use crate::config::Config;
use crate::error::{FeedError, LifecycleError};
use crate::identity::{IdentityProvider, Viewer};
use crate::lifecycle::{
    project_state, Clock, LifecycleManager, OpenResult, ReplayResult, Snap, SnapState, UtcClock,
};
use crate::store::{ChangeStream, ContentStore, Query};

/// The last observed copy of a snap document.
struct Observed {
    snap: Snap,
    version: u64,
    sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Open,
    Replay,
}

enum Outcome {
    Opened(Result<OpenResult, LifecycleError>),
    Replayed(Result<ReplayResult, LifecycleError>),
}

struct Completion {
    snap_id: String,
    outcome: Outcome,
}

/// Home feed of snaps for one viewer.
///
/// The rendered entry list is the only view state. It is rebuilt from the
/// observed documents every time changes or results arrive.
///
/// ## Example
///
/// ```ignore
/// let mut feed = FeedView::new(manager, identity, viewer, Config::default())?;
/// feed.on_notice(|notice| println!("{:?}", notice));
///
/// feed.refresh()?;
/// let first = feed.entries()[0].id().to_string();
/// feed.dispatch(&first)?;          // Unseen: opens
/// feed.wait_results(timeout);
/// feed.dispatch(&first)?;          // Seen: replays
/// ```
pub struct FeedView<S: ContentStore, I, C = UtcClock> {
    manager: Arc<LifecycleManager<S, C>>,
    identity: I,
    viewer: Viewer,
    config: Config,
    subscription: S::Stream,
    observed: HashMap<String, Observed>,
    /// Snaps opened by this view whose `viewed = true` has not arrived yet.
    opened: HashSet<String>,
    in_flight: HashMap<String, Intent>,
    labels: HashMap<String, String>,
    entries: Vec<FeedEntry>,
    results_tx: Sender<Completion>,
    results_rx: Option<Receiver<Completion>>,
    notices: EventEmitter,
}

impl<S, I, C> FeedView<S, I, C>
where
    S: ContentStore + 'static,
    I: IdentityProvider,
    C: Clock + 'static,
{
    pub fn new(
        manager: Arc<LifecycleManager<S, C>>,
        identity: I,
        viewer: Viewer,
        config: Config,
    ) -> Result<Self, FeedError> {
        let subscription = manager.store().subscribe(Query::of::<Snap>())?;
        let (results_tx, results_rx) = channel();

        Ok(Self {
            manager,
            identity,
            viewer,
            config,
            subscription,
            observed: HashMap::new(),
            opened: HashSet::new(),
            in_flight: HashMap::new(),
            labels: HashMap::new(),
            entries: Vec::new(),
            results_tx,
            results_rx: Some(results_rx),
            notices: EventEmitter::new(),
        })
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Rendered entries, newest first.
    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    pub fn entry(&self, snap_id: &str) -> Option<&FeedEntry> {
        self.entries.iter().find(|entry| entry.id() == snap_id)
    }

    pub fn is_disposed(&self) -> bool {
        self.results_rx.is_none()
    }

    /// Register a listener for [`Notice`]s. Returns the listener id.
    pub fn on_notice<F>(&mut self, listener: F) -> String
    where
        F: Fn(Notice) + Send + Sync + 'static,
    {
        self.notices.on(NOTICE_EVENT, listener)
    }

    /// Fold every pending store change into the view and re-render.
    ///
    /// Changes older than the copy already held are ignored, so arrival order
    /// does not matter. Returns the number of changes applied.
    pub fn refresh(&mut self) -> Result<usize, FeedError> {
        self.ensure_live()?;

        let mut applied = 0;
        for change in self.subscription.drain()? {
            let document = change.document;
            let id = document.reference.id.clone();

            if let Some(held) = self.observed.get(&id) {
                if held.version >= document.version {
                    continue;
                }
            }

            let snap: Snap = match document.decode() {
                Ok(snap) => snap,
                Err(err) => {
                    warn!(document = %document.reference, error = %err, "skipping undecodable snap");
                    continue;
                }
            };

            if snap.viewed {
                self.opened.remove(&id);
            }
            self.observed.insert(
                id,
                Observed {
                    snap,
                    version: document.version,
                    sequence: document.sequence,
                },
            );
            applied += 1;
        }

        if applied > 0 {
            self.render();
        }
        Ok(applied)
    }

    /// Re-read the subscription from the beginning.
    pub fn restart(&mut self) -> Result<usize, FeedError> {
        self.ensure_live()?;
        self.subscription.restart();
        self.observed.clear();
        self.entries.clear();
        self.refresh()
    }

    /// Route a tap on `snap_id`: unseen snaps are opened, seen snaps replayed.
    ///
    /// The lifecycle call runs on a background thread; its result is applied
    /// by [`poll_results`](Self::poll_results) or
    /// [`wait_results`](Self::wait_results).
    pub fn dispatch(&mut self, snap_id: &str) -> Result<DispatchOutcome, FeedError> {
        self.ensure_live()?;

        if self.in_flight.contains_key(snap_id) {
            debug!(snap_id, "tap ignored, operation in flight");
            return Ok(DispatchOutcome::Busy);
        }

        let snap = self
            .effective_snap(snap_id)
            .ok_or_else(|| FeedError::UnknownSnap(snap_id.to_string()))?;

        let intent = match project_state(&snap) {
            SnapState::Unseen => Intent::Open,
            _ => Intent::Replay,
        };
        self.in_flight.insert(snap_id.to_string(), intent);

        let manager = Arc::clone(&self.manager);
        let viewer = self.viewer.clone();
        let results = self.results_tx.clone();
        thread::spawn(move || {
            let outcome = match intent {
                Intent::Open => Outcome::Opened(manager.open(&viewer, &snap)),
                Intent::Replay => Outcome::Replayed(manager.replay(&viewer, &snap)),
            };
            // A closed channel means the view was disposed; drop the result.
            let _ = results.send(Completion {
                snap_id: snap.id,
                outcome,
            });
        });

        self.render();
        Ok(match intent {
            Intent::Open => DispatchOutcome::Opening,
            Intent::Replay => DispatchOutcome::Replaying,
        })
    }

    /// Apply every finished operation without blocking. Returns how many
    /// were applied.
    pub fn poll_results(&mut self) -> usize {
        let mut completions = Vec::new();
        if let Some(results) = &self.results_rx {
            loop {
                match results.try_recv() {
                    Ok(completion) => completions.push(completion),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }

        let applied = completions.len();
        for completion in completions {
            self.apply(completion);
        }
        if applied > 0 {
            self.render();
        }
        applied
    }

    /// Apply finished operations until none are in flight or `timeout` passes.
    pub fn wait_results(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut applied = self.poll_results();

        while !self.in_flight.is_empty() && !self.is_disposed() && Instant::now() < deadline {
            thread::sleep(self.config.result_poll_interval());
            applied += self.poll_results();
        }
        applied
    }

    /// Tear the view down. Operations still running finish in the
    /// background, but their results are discarded.
    pub fn dispose(&mut self) {
        if self.results_rx.take().is_some() {
            debug!(viewer = %self.viewer.user_id(), in_flight = self.in_flight.len(), "feed disposed");
        }
        self.in_flight.clear();
        self.entries.clear();
        self.observed.clear();
    }

    fn ensure_live(&self) -> Result<(), FeedError> {
        if self.is_disposed() {
            Err(FeedError::Disposed)
        } else {
            Ok(())
        }
    }

    /// The observed snap, with opens already made by this view applied.
    fn effective_snap(&self, snap_id: &str) -> Option<Snap> {
        let mut snap = self.observed.get(snap_id)?.snap.clone();
        if self.opened.contains(snap_id) {
            snap.viewed = true;
        }
        Some(snap)
    }

    fn apply(&mut self, completion: Completion) {
        let Completion { snap_id, outcome } = completion;
        self.in_flight.remove(&snap_id);

        let notice = match outcome {
            Outcome::Opened(Ok(_)) => {
                self.opened.insert(snap_id.clone());
                Notice::Opened { snap_id }
            }
            Outcome::Replayed(Ok(ReplayResult::Granted { .. })) => Notice::ReplayGranted { snap_id },
            Outcome::Replayed(Ok(ReplayResult::Denied { .. })) => Notice::ReplayDenied { snap_id },
            Outcome::Replayed(Err(LifecycleError::UnknownViewer(_))) => {
                Notice::ReplayUnavailable { snap_id }
            }
            Outcome::Opened(Err(LifecycleError::Storage(err)))
            | Outcome::Replayed(Err(LifecycleError::Storage(err))) => Notice::TransientFailure {
                snap_id,
                message: err.to_string(),
            },
            Outcome::Opened(Err(err)) | Outcome::Replayed(Err(err)) => {
                error!(snap_id = %snap_id, error = %err, "lifecycle call rejected");
                return;
            }
        };

        self.emit(notice);
    }

    fn emit(&mut self, notice: Notice) {
        debug!(?notice, "feed notice");
        for handle in self.notices.emit(NOTICE_EVENT, notice) {
            if handle.join().is_err() {
                warn!("notice listener panicked");
            }
        }
    }

    fn render(&mut self) {
        let mut rows: Vec<(u64, Snap)> = self
            .observed
            .values()
            .map(|observed| (observed.sequence, observed.snap.clone()))
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0));

        let mut entries = Vec::with_capacity(rows.len());
        for (_, mut snap) in rows {
            if self.opened.contains(&snap.id) {
                snap.viewed = true;
            }
            let state = match self.in_flight.get(&snap.id) {
                Some(Intent::Replay) => SnapState::Replaying,
                _ => project_state(&snap),
            };
            let sender_label = self.sender_label(&snap.sender_id);
            entries.push(FeedEntry {
                snap,
                state,
                sender_label,
            });
        }
        self.entries = entries;
    }

    fn sender_label(&mut self, sender_id: &str) -> String {
        if let Some(label) = self.labels.get(sender_id) {
            return label.clone();
        }

        match self.identity.get_user_profile(sender_id) {
            Ok(Some(profile)) => {
                self.labels
                    .insert(sender_id.to_string(), profile.username.clone());
                profile.username
            }
            Ok(None) => self.config.unknown_sender_label.clone(),
            Err(err) => {
                warn!(sender_id, error = %err, "sender profile unavailable");
                self.config.unknown_sender_label.clone()
            }
        }
    }
}
