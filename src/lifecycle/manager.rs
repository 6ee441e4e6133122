use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{
    project_state, Clock, OpenResult, ReplayCredit, ReplayDenial, ReplayResult, Snap, SnapState,
    UtcClock,
};
use crate::error::{LifecycleError, StoreError};
use crate::identity::{UserProfile, Viewer};
use crate::store::{ContentStore, DocumentRef, FieldPredicate, RecordStoreExt, UpdateOutcome};
use crate::Record;

/// Policy layer over the content store: projects snap state and mediates
/// `open` and `replay`. Owns no storage of its own.
///
/// Every write is a single conditional update, so concurrent taps from the
/// same viewer can neither double-open a snap nor spend two credits a day.
pub struct LifecycleManager<S, C = UtcClock> {
    store: S,
    clock: C,
}

impl<S: ContentStore> LifecycleManager<S, UtcClock> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, UtcClock)
    }
}

impl<S: ContentStore, C: Clock> LifecycleManager<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn project_state(&self, snap: &Snap) -> SnapState {
        project_state(snap)
    }

    /// First view of an unseen snap. Persists `viewed = true`.
    ///
    /// Opening a snap observed as `Seen` is a caller bug (replays go through
    /// [`replay`](Self::replay)) and fails with `InvalidState`. If the store
    /// already holds `viewed = true` because another open won the race, the
    /// call is a no-op.
    pub fn open(&self, viewer: &Viewer, snap: &Snap) -> Result<OpenResult, LifecycleError> {
        let state = project_state(snap);
        if state != SnapState::Unseen {
            return Err(LifecycleError::InvalidState {
                snap_id: snap.id.clone(),
                state,
                operation: "open",
            });
        }

        let mut fields = Map::new();
        fields.insert(Snap::VIEWED.to_string(), Value::Bool(true));

        let outcome = self
            .store
            .conditional_update(
                &snap.reference(),
                &FieldPredicate::equals(Snap::VIEWED, false),
                fields,
            )
            .map_err(|err| {
                warn!(snap_id = %snap.id, viewer = %viewer.user_id(), error = %err, "open failed");
                LifecycleError::from(err)
            })?;

        let newly_viewed = outcome.is_applied();
        if newly_viewed {
            info!(snap_id = %snap.id, viewer = %viewer.user_id(), "snap opened");
        } else {
            debug!(snap_id = %snap.id, viewer = %viewer.user_id(), "snap already viewed");
        }

        Ok(OpenResult {
            replay: false,
            newly_viewed,
        })
    }

    /// Spend the viewer's daily replay credit on a seen snap.
    ///
    /// Check and spend are one conditional write on the viewer's profile
    /// (`lastReplayDate` absent or before today), so only one of any number of
    /// concurrent attempts on the same UTC day is granted. `Granted` is only
    /// returned after that write is durable.
    pub fn replay(&self, viewer: &Viewer, snap: &Snap) -> Result<ReplayResult, LifecycleError> {
        let state = project_state(snap);
        if state != SnapState::Seen {
            return Err(LifecycleError::InvalidState {
                snap_id: snap.id.clone(),
                state,
                operation: "replay",
            });
        }

        let today = self.clock.today();
        let profile = DocumentRef::new(UserProfile::COLLECTION, viewer.user_id());

        let outcome = ReplayCredit::available_predicate(today)
            .and_then(|predicate| {
                let fields = ReplayCredit::consumed_fields(today)?;
                self.store.conditional_update(&profile, &predicate, fields)
            })
            .map_err(|err| match err {
                StoreError::NotFound { .. } => {
                    warn!(snap_id = %snap.id, viewer = %viewer.user_id(), "replay without profile");
                    LifecycleError::UnknownViewer(viewer.user_id().to_string())
                }
                err => {
                    warn!(snap_id = %snap.id, viewer = %viewer.user_id(), error = %err, "replay failed");
                    LifecycleError::from(err)
                }
            })?;

        match outcome {
            UpdateOutcome::Applied { .. } => {
                info!(snap_id = %snap.id, viewer = %viewer.user_id(), %today, "replay granted");
                Ok(ReplayResult::Granted { replay_date: today })
            }
            UpdateOutcome::PredicateFailed => {
                info!(snap_id = %snap.id, viewer = %viewer.user_id(), %today, "replay quota exceeded");
                Ok(ReplayResult::Denied {
                    reason: ReplayDenial::QuotaExceeded,
                })
            }
        }
    }

    /// The viewer's credit as currently stored. A viewer without a profile
    /// has no credit, matching [`replay`](Self::replay).
    pub fn replay_credit(&self, viewer: &Viewer) -> Result<ReplayCredit, LifecycleError> {
        self.store
            .get_record::<UserProfile>(viewer.user_id())?
            .map(|profile| ReplayCredit::from_profile(&profile))
            .ok_or_else(|| LifecycleError::UnknownViewer(viewer.user_id().to_string()))
    }

    /// Whether a replay would be granted right now. Advisory only: the
    /// decision is made by [`replay`](Self::replay).
    pub fn replay_available(&self, viewer: &Viewer) -> Result<bool, LifecycleError> {
        Ok(self.replay_credit(viewer)?.is_available(self.clock.today()))
    }
}
