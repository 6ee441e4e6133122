//! Feed view - the home feed of snaps, bound to a live subscription.
//!
//! The view folds store changes into the rendered list, projects each snap
//! through the lifecycle policy, and turns taps into `open` or `replay`
//! calls that run off the caller's thread.

mod notice;
mod view;

use crate::lifecycle::{Snap, SnapState};

pub use notice::{Notice, NOTICE_EVENT};
pub use view::FeedView;

/// One rendered row of the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub snap: Snap,
    pub state: SnapState,
    /// Sender's username, or the configured placeholder when unresolved.
    pub sender_label: String,
}

impl FeedEntry {
    pub fn id(&self) -> &str {
        &self.snap.id
    }
}

/// What a tap started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Opening,
    Replaying,
    /// An operation on this snap is still in flight; the tap was ignored.
    Busy,
}
