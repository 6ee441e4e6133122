//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{Map, Value};
use snap_lifecycle::{
    ChangeKind, ChangeStream, ContentStore, Document, DocumentChange, DocumentRef, FieldPredicate,
    FixedClock, InMemoryContentStore, LifecycleManager, Query, Record, RecordStoreExt, Snap,
    StoreError, UpdateOutcome, UserProfile,
};

/// A store whose writes can be switched to fail, standing in for a dropped
/// connection.
#[derive(Clone)]
pub struct FlakyStore<S> {
    inner: S,
    fail_writes: Arc<AtomicBool>,
}

impl<S: ContentStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection reset".into()))
        } else {
            Ok(())
        }
    }
}

impl<S: ContentStore> ContentStore for FlakyStore<S> {
    type Stream = S::Stream;

    fn create(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<DocumentRef, StoreError> {
        self.check()?;
        self.inner.create(collection, fields)
    }

    fn set(&self, reference: &DocumentRef, fields: Map<String, Value>) -> Result<u64, StoreError> {
        self.check()?;
        self.inner.set(reference, fields)
    }

    fn get_document(&self, reference: &DocumentRef) -> Result<Option<Document>, StoreError> {
        self.inner.get_document(reference)
    }

    fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.inner.query(query)
    }

    fn conditional_update(
        &self,
        reference: &DocumentRef,
        predicate: &FieldPredicate,
        fields_to_set: Map<String, Value>,
    ) -> Result<UpdateOutcome, StoreError> {
        self.check()?;
        self.inner
            .conditional_update(reference, predicate, fields_to_set)
    }

    fn subscribe(&self, query: Query) -> Result<Self::Stream, StoreError> {
        self.inner.subscribe(query)
    }
}

/// A store whose subscriptions only see the changes a test hands them, in
/// whatever order it chooses. Reads and writes go to the inner store.
#[derive(Clone)]
pub struct ScriptedStore {
    inner: InMemoryContentStore,
    pending: Arc<Mutex<VecDeque<DocumentChange>>>,
}

impl ScriptedStore {
    pub fn new(inner: InMemoryContentStore) -> Self {
        Self {
            inner,
            pending: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn inner(&self) -> &InMemoryContentStore {
        &self.inner
    }

    /// The snap document as the inner store holds it now.
    pub fn current(&self, snap_id: &str) -> Document {
        self.inner
            .get_document(&DocumentRef::new(Snap::COLLECTION, snap_id))
            .unwrap()
            .unwrap()
    }

    pub fn deliver(&self, document: Document) {
        let kind = if document.version == 1 {
            ChangeKind::Added
        } else {
            ChangeKind::Modified
        };
        self.pending
            .lock()
            .unwrap()
            .push_back(DocumentChange { kind, document });
    }
}

pub struct ScriptedStream {
    pending: Arc<Mutex<VecDeque<DocumentChange>>>,
}

impl ChangeStream for ScriptedStream {
    fn poll(&mut self, _timeout: Duration) -> Result<Option<DocumentChange>, StoreError> {
        Ok(self.pending.lock().unwrap().pop_front())
    }

    fn restart(&mut self) {}
}

impl ContentStore for ScriptedStore {
    type Stream = ScriptedStream;

    fn create(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<DocumentRef, StoreError> {
        self.inner.create(collection, fields)
    }

    fn set(&self, reference: &DocumentRef, fields: Map<String, Value>) -> Result<u64, StoreError> {
        self.inner.set(reference, fields)
    }

    fn get_document(&self, reference: &DocumentRef) -> Result<Option<Document>, StoreError> {
        self.inner.get_document(reference)
    }

    fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.inner.query(query)
    }

    fn conditional_update(
        &self,
        reference: &DocumentRef,
        predicate: &FieldPredicate,
        fields_to_set: Map<String, Value>,
    ) -> Result<UpdateOutcome, StoreError> {
        self.inner
            .conditional_update(reference, predicate, fields_to_set)
    }

    fn subscribe(&self, _query: Query) -> Result<ScriptedStream, StoreError> {
        Ok(ScriptedStream {
            pending: Arc::clone(&self.pending),
        })
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn today() -> NaiveDate {
    date(2024, 3, 10)
}

/// A store holding profiles for `ada` (the viewer) and `bob` (a sender).
pub fn seeded_store() -> InMemoryContentStore {
    let store = InMemoryContentStore::new();
    store.put_record(&UserProfile::new("ada", "Ada")).unwrap();
    store.put_record(&UserProfile::new("bob", "Bob")).unwrap();
    store
}

pub fn manager<S: ContentStore>(store: S) -> LifecycleManager<S, FixedClock> {
    LifecycleManager::with_clock(store, FixedClock::on(today()))
}

pub fn send_snap<S: ContentStore>(store: &S, sender: &str, payload: &str) -> Snap {
    store.create_record(&Snap::new(sender, payload)).unwrap()
}

/// The snap as currently stored.
pub fn stored_snap<S: ContentStore>(store: &S, id: &str) -> Snap {
    store.get_record(id).unwrap().unwrap()
}

pub fn set_last_replay<S: ContentStore>(store: &S, user_id: &str, last: Option<NaiveDate>) {
    let mut profile: UserProfile = store.get_record(user_id).unwrap().unwrap();
    profile.last_replay_date = last;
    store.put_record(&profile).unwrap();
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
