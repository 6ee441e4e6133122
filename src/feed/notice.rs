use serde::{Deserialize, Serialize};

/// Event name notices are emitted under.
pub const NOTICE_EVENT: &str = "notice";

/// A user-visible message produced by a finished tap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    Opened { snap_id: String },
    ReplayGranted { snap_id: String },
    /// Informational: today's replay is already used.
    ReplayDenied { snap_id: String },
    /// The viewer has no profile, so no replay can be granted. Retrying
    /// will not help until a profile is registered.
    ReplayUnavailable { snap_id: String },
    /// The store call failed; the user may try again.
    TransientFailure { snap_id: String, message: String },
}

impl Notice {
    pub fn snap_id(&self) -> &str {
        match self {
            Notice::Opened { snap_id }
            | Notice::ReplayGranted { snap_id }
            | Notice::ReplayDenied { snap_id }
            | Notice::ReplayUnavailable { snap_id }
            | Notice::TransientFailure { snap_id, .. } => snap_id,
        }
    }
}
