//! Identity - who is looking, and who sent what.

mod session;
mod store_provider;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::Record;

pub use session::Session;
pub use store_provider::StoreIdentityProvider;

/// A user's public profile plus their replay-credit bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Record)]
#[record(collection = "users")]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[record(id)]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar_ref: Option<String>,
    /// UTC calendar date of the last consumed replay credit.
    #[serde(default)]
    pub last_replay_date: Option<NaiveDate>,
}

impl UserProfile {
    /// Document field holding [`UserProfile::last_replay_date`].
    pub const LAST_REPLAY_DATE: &'static str = "lastReplayDate";

    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            avatar_ref: None,
            last_replay_date: None,
        }
    }

    pub fn with_avatar(mut self, avatar_ref: impl Into<String>) -> Self {
        self.avatar_ref = Some(avatar_ref.into());
        self
    }
}

/// The account on whose behalf a lifecycle operation runs.
///
/// Passed explicitly into every operation instead of read from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Viewer {
    user_id: String,
}

impl Viewer {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// Build the viewer for whoever is signed in.
    pub fn current<I: IdentityProvider + ?Sized>(identity: &I) -> Result<Self, IdentityError> {
        identity.current_user().map(Self::new)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// The authentication/profile provider the views are wired to.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user's id.
    fn current_user(&self) -> Result<String, IdentityError>;

    /// Profile for `user_id`, or `None` if the user has no profile.
    fn get_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, IdentityError>;
}
