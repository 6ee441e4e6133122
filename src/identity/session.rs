//! Session variables for the signed-in device.

use std::collections::HashMap;

const USER_ID: &str = "user-id";

/// Variables handed over by the authentication provider after sign-in.
///
/// ```
/// use snap_lifecycle::Session;
///
/// let session = Session::signed_in("user-42");
/// assert_eq!(session.user_id(), Some("user-42"));
/// assert_eq!(Session::new().user_id(), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Session {
    variables: HashMap<String, String>,
}

impl Session {
    /// Create an empty (signed-out) session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.set(USER_ID, user_id);
        session
    }

    pub fn from_map(variables: HashMap<String, String>) -> Self {
        Self { variables }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get(USER_ID)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(|v| v.as_str())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Drop every variable, signing the user out.
    pub fn clear(&mut self) {
        self.variables.clear();
    }
}
