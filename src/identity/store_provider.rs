use std::sync::{Arc, RwLock};

use tracing::info;

use super::{IdentityProvider, Session, UserProfile};
use crate::error::{IdentityError, StoreError};
use crate::store::{ContentStore, RecordStoreExt};

/// Identity provider whose profiles live in the `users` collection of a
/// content store.
///
/// Clones share the session, so signing out through one handle signs out
/// all of them.
#[derive(Clone)]
pub struct StoreIdentityProvider<S> {
    store: S,
    session: Arc<RwLock<Session>>,
}

impl<S: ContentStore> StoreIdentityProvider<S> {
    pub fn new(store: S, session: Session) -> Self {
        Self {
            store,
            session: Arc::new(RwLock::new(session)),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sign_in(&self, user_id: impl Into<String>) -> Result<(), IdentityError> {
        let mut session = self
            .session
            .write()
            .map_err(|_| IdentityError::Store(StoreError::LockPoisoned("session")))?;
        *session = Session::signed_in(user_id);
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), IdentityError> {
        let mut session = self
            .session
            .write()
            .map_err(|_| IdentityError::Store(StoreError::LockPoisoned("session")))?;
        session.clear();
        Ok(())
    }

    /// Create the signed-in user's profile (the registration flow).
    ///
    /// A new profile has no replay consumed. Registering again replaces
    /// username and avatar but keeps the replay bookkeeping.
    pub fn register(
        &self,
        username: &str,
        avatar_ref: Option<&str>,
    ) -> Result<UserProfile, IdentityError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(IdentityError::InvalidProfile(
                "username must not be blank".into(),
            ));
        }

        let user_id = self.current_user()?;
        let existing = self.store.get_record::<UserProfile>(&user_id)?;

        let mut profile = UserProfile::new(&user_id, username);
        profile.avatar_ref = avatar_ref.map(str::to_string);
        profile.last_replay_date = existing.and_then(|p| p.last_replay_date);

        self.store.put_record(&profile)?;
        info!(user_id = %user_id, username = %profile.username, "profile registered");
        Ok(profile)
    }
}

impl<S: ContentStore> IdentityProvider for StoreIdentityProvider<S> {
    fn current_user(&self) -> Result<String, IdentityError> {
        let session = self
            .session
            .read()
            .map_err(|_| IdentityError::Store(StoreError::LockPoisoned("session")))?;
        session
            .user_id()
            .map(str::to_string)
            .ok_or(IdentityError::NotSignedIn)
    }

    fn get_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, IdentityError> {
        Ok(self.store.get_record::<UserProfile>(user_id)?)
    }
}
