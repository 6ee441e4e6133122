//! Content store - the live document database the views are bound to.
//!
//! Documents are JSON objects addressed by [`DocumentRef`]. Every successful
//! write is published as a [`DocumentChange`] to subscribers, and
//! [`ContentStore::conditional_update`] is the single atomic primitive the
//! lifecycle policy relies on.

mod in_memory;
mod predicate;
mod subscription;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::record::Record;

pub use in_memory::InMemoryContentStore;
pub use predicate::FieldPredicate;
pub use subscription::InMemorySubscription;

/// Address of a document: `collection/id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A document as last observed from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub reference: DocumentRef,
    pub fields: Map<String, Value>,
    /// Per-document write counter, starting at 1.
    pub version: u64,
    /// Store-wide creation order.
    pub sequence: u64,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn decode<R: Record>(&self) -> Result<R, StoreError> {
        R::from_document(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub document: Document,
}

/// A collection plus a filter on document fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filter: FieldPredicate,
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filter: FieldPredicate::Always,
        }
    }

    pub fn of<R: Record>() -> Self {
        Self::collection(R::COLLECTION)
    }

    pub fn filter(mut self, filter: FieldPredicate) -> Self {
        self.filter = filter;
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        document.reference.collection == self.collection && self.filter.evaluate(&document.fields)
    }
}

/// Result of a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied { version: u64 },
    /// The predicate did not hold; nothing was written.
    PredicateFailed,
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied { .. })
    }
}

/// A live, restartable sequence of changes for one query.
///
/// Starts at the beginning of the store's history, so the first drain
/// delivers the current state as a series of changes.
pub trait ChangeStream: Send {
    /// Wait up to `timeout` for the next matching change.
    fn poll(&mut self, timeout: Duration) -> Result<Option<DocumentChange>, StoreError>;

    /// Rewind to the beginning of the history.
    fn restart(&mut self);

    /// Take every change available right now without waiting.
    fn drain(&mut self) -> Result<Vec<DocumentChange>, StoreError> {
        let mut changes = Vec::new();
        while let Some(change) = self.poll(Duration::ZERO)? {
            changes.push(change);
        }
        Ok(changes)
    }
}

/// The document database the views and the lifecycle policy talk to.
pub trait ContentStore: Send + Sync {
    type Stream: ChangeStream + 'static;

    /// Create a document; the store assigns its id.
    fn create(&self, collection: &str, fields: Map<String, Value>)
        -> Result<DocumentRef, StoreError>;

    /// Create or replace the document at `reference`. Returns the new version.
    fn set(&self, reference: &DocumentRef, fields: Map<String, Value>) -> Result<u64, StoreError>;

    fn get_document(&self, reference: &DocumentRef) -> Result<Option<Document>, StoreError>;

    fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Merge `fields_to_set` into the document only if `predicate` holds on its
    /// current fields. Check and write are one atomic step.
    fn conditional_update(
        &self,
        reference: &DocumentRef,
        predicate: &FieldPredicate,
        fields_to_set: Map<String, Value>,
    ) -> Result<UpdateOutcome, StoreError>;

    fn subscribe(&self, query: Query) -> Result<Self::Stream, StoreError>;
}

/// Typed access to records on any [`ContentStore`].
pub trait RecordStoreExt: ContentStore {
    /// Create a record, returning it with the store-assigned id.
    fn create_record<R: Record>(&self, record: &R) -> Result<R, StoreError> {
        let mut fields = record.to_fields()?;
        fields.remove(R::ID_FIELD);
        let reference = self.create(R::COLLECTION, fields)?;
        self.get_record(&reference.id)?
            .ok_or(StoreError::NotFound {
                collection: reference.collection,
                id: reference.id,
            })
    }

    /// Write a record under its own id.
    fn put_record<R: Record>(&self, record: &R) -> Result<u64, StoreError> {
        let mut fields = record.to_fields()?;
        fields.remove(R::ID_FIELD);
        self.set(&record.reference(), fields)
    }

    fn get_record<R: Record>(&self, id: &str) -> Result<Option<R>, StoreError> {
        self.get_document(&DocumentRef::new(R::COLLECTION, id))?
            .map(|document| document.decode())
            .transpose()
    }
}

impl<S: ContentStore + ?Sized> RecordStoreExt for S {}
