use std::error::Error;
use std::fmt;

use crate::lifecycle::SnapState;

/// Failure of the content store or its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    LockPoisoned(&'static str),
    NotFound {
        collection: String,
        id: String,
    },
    /// Document fields could not be (de)serialized.
    Serde(String),
    /// The backend rejected or failed the call.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::LockPoisoned(operation) => {
                write!(f, "store lock poisoned during {}", operation)
            }
            StoreError::NotFound { collection, id } => {
                write!(f, "document not found: {}/{}", collection, id)
            }
            StoreError::Serde(msg) => write!(f, "document serialization error: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {}", msg),
        }
    }
}

impl Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serde(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// No user is signed in on this session.
    NotSignedIn,
    InvalidProfile(String),
    Store(StoreError),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::NotSignedIn => write!(f, "no user signed in"),
            IdentityError::InvalidProfile(msg) => write!(f, "invalid profile: {}", msg),
            IdentityError::Store(e) => write!(f, "identity store error: {}", e),
        }
    }
}

impl Error for IdentityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IdentityError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for IdentityError {
    fn from(err: StoreError) -> Self {
        IdentityError::Store(err)
    }
}

/// Errors raised by lifecycle operations.
///
/// A denied replay is not an error; it is reported as
/// [`ReplayResult::Denied`](crate::ReplayResult::Denied) with
/// [`ReplayDenial::QuotaExceeded`](crate::ReplayDenial::QuotaExceeded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Persisting or reading lifecycle state failed. Never retried by the manager.
    Storage(StoreError),
    /// The operation does not apply to the snap's observed state
    /// (e.g. `open` on a snap that is already `Seen`).
    InvalidState {
        snap_id: String,
        state: SnapState,
        operation: &'static str,
    },
    /// The viewer has no `users` profile, so there is no credit to check or spend.
    UnknownViewer(String),
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::Storage(e) => write!(f, "storage error: {}", e),
            LifecycleError::InvalidState {
                snap_id,
                state,
                operation,
            } => write!(
                f,
                "cannot {} snap {} in state {:?}",
                operation, snap_id, state
            ),
            LifecycleError::UnknownViewer(id) => write!(f, "no profile for viewer {}", id),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LifecycleError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        LifecycleError::Storage(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    UnknownSnap(String),
    /// The view was torn down.
    Disposed,
    Store(StoreError),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::UnknownSnap(id) => write!(f, "snap not in feed: {}", id),
            FeedError::Disposed => write!(f, "feed view disposed"),
            FeedError::Store(e) => write!(f, "feed store error: {}", e),
        }
    }
}

impl Error for FeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FeedError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for FeedError {
    fn from(err: StoreError) -> Self {
        FeedError::Store(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    EmptyMessage,
    TooLong { len: usize, max: usize },
    Store(StoreError),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::EmptyMessage => write!(f, "message is empty"),
            ChatError::TooLong { len, max } => {
                write!(f, "message too long ({} characters, max {})", len, max)
            }
            ChatError::Store(e) => write!(f, "chat store error: {}", e),
        }
    }
}

impl Error for ChatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ChatError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        ChatError::Store(err)
    }
}
