//! InMemoryContentStore - HashMap-backed content store for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};
use tracing::debug;

use super::{
    ChangeKind, ContentStore, Document, DocumentChange, DocumentRef, FieldPredicate,
    InMemorySubscription, Query, UpdateOutcome,
};
use crate::error::StoreError;

struct StoredDocument {
    fields: Map<String, Value>,
    version: u64,
    sequence: u64,
}

impl StoredDocument {
    fn snapshot(&self, reference: &DocumentRef) -> Document {
        Document {
            reference: reference.clone(),
            fields: self.fields.clone(),
            version: self.version,
            sequence: self.sequence,
        }
    }
}

/// In-memory content store.
///
/// Clone-friendly via Arc: clones share documents, history, and the id
/// sequence, so a clone can be handed to a background worker.
///
/// Every write appends a full copy of the document to the change history,
/// which is never compacted. Memory grows with the number of writes, so this
/// store suits tests and short local sessions.
#[derive(Clone)]
pub struct InMemoryContentStore {
    documents: Arc<RwLock<HashMap<DocumentRef, StoredDocument>>>,
    changes: Arc<RwLock<Vec<DocumentChange>>>,
    sequence: Arc<AtomicU64>,
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
            changes: Arc::new(RwLock::new(Vec::new())),
            sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Number of changes recorded so far (one per successful write).
    pub fn change_count(&self) -> Result<usize, StoreError> {
        let changes = self
            .changes
            .read()
            .map_err(|_| StoreError::LockPoisoned("history read"))?;
        Ok(changes.len())
    }

    fn record_change(&self, kind: ChangeKind, document: Document) -> Result<(), StoreError> {
        let mut changes = self
            .changes
            .write()
            .map_err(|_| StoreError::LockPoisoned("history write"))?;
        changes.push(DocumentChange { kind, document });
        Ok(())
    }
}

impl ContentStore for InMemoryContentStore {
    type Stream = InMemorySubscription;

    fn create(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<DocumentRef, StoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::LockPoisoned("create"))?;

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let reference = DocumentRef::new(collection, sequence.to_string());
        let stored = StoredDocument {
            fields,
            version: 1,
            sequence,
        };
        // History first, under the document lock: a write is only committed
        // once subscribers can see it, and log order matches write order.
        self.record_change(ChangeKind::Added, stored.snapshot(&reference))?;
        documents.insert(reference.clone(), stored);

        debug!(document = %reference, "document created");
        Ok(reference)
    }

    fn set(&self, reference: &DocumentRef, fields: Map<String, Value>) -> Result<u64, StoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::LockPoisoned("set"))?;

        let (kind, next) = match documents.get(reference) {
            Some(stored) => (
                ChangeKind::Modified,
                StoredDocument {
                    fields,
                    version: stored.version + 1,
                    sequence: stored.sequence,
                },
            ),
            None => (
                ChangeKind::Added,
                StoredDocument {
                    fields,
                    version: 1,
                    sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
                },
            ),
        };
        let version = next.version;
        self.record_change(kind, next.snapshot(reference))?;
        documents.insert(reference.clone(), next);

        debug!(document = %reference, version, "document set");
        Ok(version)
    }

    fn get_document(&self, reference: &DocumentRef) -> Result<Option<Document>, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::LockPoisoned("get"))?;
        Ok(documents.get(reference).map(|stored| stored.snapshot(reference)))
    }

    fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::LockPoisoned("query"))?;

        let mut results: Vec<Document> = documents
            .iter()
            .filter(|(reference, stored)| {
                reference.collection == query.collection && query.filter.evaluate(&stored.fields)
            })
            .map(|(reference, stored)| stored.snapshot(reference))
            .collect();
        results.sort_by_key(|document| document.sequence);
        Ok(results)
    }

    fn conditional_update(
        &self,
        reference: &DocumentRef,
        predicate: &FieldPredicate,
        fields_to_set: Map<String, Value>,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::LockPoisoned("conditional update"))?;

        let stored = documents
            .get(reference)
            .ok_or_else(|| StoreError::NotFound {
                collection: reference.collection.clone(),
                id: reference.id.clone(),
            })?;

        if !predicate.evaluate(&stored.fields) {
            debug!(document = %reference, "conditional update rejected");
            return Ok(UpdateOutcome::PredicateFailed);
        }

        let mut fields = stored.fields.clone();
        fields.extend(fields_to_set);
        let next = StoredDocument {
            fields,
            version: stored.version + 1,
            sequence: stored.sequence,
        };
        let version = next.version;
        self.record_change(ChangeKind::Modified, next.snapshot(reference))?;
        documents.insert(reference.clone(), next);

        debug!(document = %reference, version, "conditional update applied");
        Ok(UpdateOutcome::Applied { version })
    }

    fn subscribe(&self, query: Query) -> Result<InMemorySubscription, StoreError> {
        Ok(InMemorySubscription::new(Arc::clone(&self.changes), query))
    }
}
