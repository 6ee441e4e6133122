//! Snap lifecycle - the first-view transition and the daily replay credit.
//!
//! | State  | Event  | Guard            | Next   | Side effect                  |
//! |--------|--------|------------------|--------|------------------------------|
//! | Unseen | open   |                  | Seen   | persist `viewed = true`      |
//! | Seen   | replay | credit available | Seen   | persist `lastReplayDate`     |
//! | Seen   | replay | credit used      | Seen   | none, quota exceeded         |
//!
//! `Seen` is terminal: snaps never expire.

mod clock;
mod credit;
mod manager;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Record;

pub use clock::{Clock, FixedClock, UtcClock};
pub use credit::ReplayCredit;
pub use manager::LifecycleManager;

/// An ephemeral content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Record)]
#[record(collection = "snaps")]
#[serde(rename_all = "camelCase")]
pub struct Snap {
    #[record(id)]
    #[serde(default)]
    pub id: String,
    pub sender_id: String,
    /// Opaque reference to the media.
    pub payload_ref: String,
    /// Flipped once, by the recipient's first open. Never reverts.
    #[serde(default)]
    pub viewed: bool,
}

impl Snap {
    pub const VIEWED: &'static str = "viewed";

    /// An unsent snap; the store assigns the id on creation.
    pub fn new(sender_id: impl Into<String>, payload_ref: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            sender_id: sender_id.into(),
            payload_ref: payload_ref.into(),
            viewed: false,
        }
    }
}

/// Presentable state of a snap for its viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapState {
    Unseen,
    Seen,
    /// A replay credit check is in flight. Never produced by [`project_state`].
    Replaying,
}

/// `Unseen` iff the snap has not been viewed. Pure.
pub fn project_state(snap: &Snap) -> SnapState {
    if snap.viewed {
        SnapState::Seen
    } else {
        SnapState::Unseen
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenResult {
    /// Always false: opening is never a replay.
    pub replay: bool,
    /// False when another open already persisted the view.
    pub newly_viewed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayDenial {
    /// Today's credit is already spent.
    QuotaExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayResult {
    Granted { replay_date: NaiveDate },
    Denied { reason: ReplayDenial },
}

impl ReplayResult {
    pub fn granted(&self) -> bool {
        matches!(self, ReplayResult::Granted { .. })
    }

    pub fn reason(&self) -> Option<ReplayDenial> {
        match self {
            ReplayResult::Granted { .. } => None,
            ReplayResult::Denied { reason } => Some(*reason),
        }
    }
}
