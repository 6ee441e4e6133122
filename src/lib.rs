// The Record derive expands to `snap_lifecycle::Record`, which must also
// resolve inside this crate.
extern crate self as snap_lifecycle;

pub mod chat;
mod config;
mod error;
pub mod feed;
pub mod identity;
pub mod lifecycle;
mod record;
pub mod store;

pub use chat::{ChatMessage, ChatStream};
pub use config::Config;
pub use error::{ChatError, FeedError, IdentityError, LifecycleError, StoreError};
pub use feed::{DispatchOutcome, FeedEntry, FeedView, Notice, NOTICE_EVENT};
pub use identity::{IdentityProvider, Session, StoreIdentityProvider, UserProfile, Viewer};
pub use lifecycle::{
    project_state, Clock, FixedClock, LifecycleManager, OpenResult, ReplayCredit, ReplayDenial,
    ReplayResult, Snap, SnapState, UtcClock,
};
pub use record::Record;
pub use store::{
    ChangeKind, ChangeStream, ContentStore, Document, DocumentChange, DocumentRef, FieldPredicate,
    InMemoryContentStore, InMemorySubscription, Query, RecordStoreExt, UpdateOutcome,
};

// Derive macro for `Record`
pub use snap_lifecycle_macros::Record;

// Re-export the EventEmitter notices are delivered through
pub use event_emitter_rs::EventEmitter;
