use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use super::{ChangeStream, DocumentChange, Query};
use crate::error::StoreError;

/// How long the blocking iterator waits per poll before checking again.
const ITER_POLL: Duration = Duration::from_millis(50);

/// A subscription over the in-memory store's change history.
///
/// Each subscription tracks its own read position into the shared,
/// append-only history and only yields changes matching its query.
///
/// ## Example
///
/// ```
/// use snap_lifecycle::{ChangeStream, ContentStore, InMemoryContentStore, Query};
/// use serde_json::json;
///
/// let store = InMemoryContentStore::new();
/// let mut snaps = store.subscribe(Query::collection("snaps")).unwrap();
///
/// let fields = json!({ "viewed": false }).as_object().cloned().unwrap();
/// store.create("snaps", fields).unwrap();
///
/// assert_eq!(snaps.drain().unwrap().len(), 1);
/// assert!(snaps.drain().unwrap().is_empty());
///
/// snaps.restart();
/// assert_eq!(snaps.drain().unwrap().len(), 1);
/// ```
pub struct InMemorySubscription {
    history: Arc<RwLock<Vec<DocumentChange>>>,
    position: usize,
    query: Query,
}

impl InMemorySubscription {
    pub(crate) fn new(history: Arc<RwLock<Vec<DocumentChange>>>, query: Query) -> Self {
        Self {
            history,
            position: 0,
            query,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Current read position in the store's history.
    pub fn position(&self) -> usize {
        self.position
    }

    fn next_available(&mut self) -> Result<Option<DocumentChange>, StoreError> {
        let history = self
            .history
            .read()
            .map_err(|_| StoreError::LockPoisoned("subscription read"))?;

        while self.position < history.len() {
            let change = &history[self.position];
            self.position += 1;
            if self.query.matches(&change.document) {
                return Ok(Some(change.clone()));
            }
        }
        Ok(None)
    }
}

impl ChangeStream for InMemorySubscription {
    fn poll(&mut self, timeout: Duration) -> Result<Option<DocumentChange>, StoreError> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(change) = self.next_available()? {
                return Ok(Some(change));
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            // Small sleep to avoid busy-waiting
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn restart(&mut self) {
        self.position = 0;
    }
}

/// Blocking, never-ending iteration over matching changes.
impl Iterator for InMemorySubscription {
    type Item = Result<DocumentChange, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.poll(ITER_POLL) {
                Ok(Some(change)) => return Some(Ok(change)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ChangeKind, ContentStore, FieldPredicate, InMemoryContentStore};
    use serde_json::{json, Map, Value};

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn poll_timeout_when_empty() {
        let store = InMemoryContentStore::new();
        let mut subscription = store.subscribe(Query::collection("snaps")).unwrap();
        assert!(subscription.poll(Duration::from_millis(10)).unwrap().is_none());
    }

    #[test]
    fn late_subscriber_sees_full_history() {
        let store = InMemoryContentStore::new();
        let reference = store.create("snaps", fields(json!({ "viewed": false }))).unwrap();
        store
            .conditional_update(
                &reference,
                &FieldPredicate::Always,
                fields(json!({ "viewed": true })),
            )
            .unwrap();

        let mut subscription = store.subscribe(Query::collection("snaps")).unwrap();
        let changes = subscription.drain().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].kind, ChangeKind::Added);
        assert_eq!(changes[1].kind, ChangeKind::Modified);
        assert_eq!(changes[1].document.version, 2);
    }

    #[test]
    fn filters_other_collections() {
        let store = InMemoryContentStore::new();
        store.create("messages", fields(json!({ "text": "hi" }))).unwrap();
        store.create("snaps", fields(json!({ "viewed": false }))).unwrap();

        let mut subscription = store.subscribe(Query::collection("snaps")).unwrap();
        let changes = subscription.drain().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].document.reference.collection, "snaps");
        assert_eq!(subscription.position(), 2);
    }

    #[test]
    fn filtered_subscription_skips_non_matching() {
        let store = InMemoryContentStore::new();
        let unviewed = Query::collection("snaps").filter(FieldPredicate::equals("viewed", false));
        let mut subscription = store.subscribe(unviewed.clone()).unwrap();
        assert_eq!(subscription.query(), &unviewed);

        store.create("snaps", fields(json!({ "viewed": true }))).unwrap();
        let kept = store.create("snaps", fields(json!({ "viewed": false }))).unwrap();

        let changes = subscription.drain().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].document.reference, kept);
    }

    #[test]
    fn independent_positions() {
        let store = InMemoryContentStore::new();
        let mut first = store.subscribe(Query::collection("snaps")).unwrap();
        let mut second = store.subscribe(Query::collection("snaps")).unwrap();

        store.create("snaps", fields(json!({ "viewed": false }))).unwrap();

        assert_eq!(first.drain().unwrap().len(), 1);
        assert_eq!(second.drain().unwrap().len(), 1);
        assert!(first.drain().unwrap().is_empty());
    }

    #[test]
    fn poll_wakes_on_write_from_other_thread() {
        let store = InMemoryContentStore::new();
        let mut subscription = store.subscribe(Query::collection("snaps")).unwrap();

        let writer = store.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            writer.create("snaps", fields(json!({ "viewed": false }))).unwrap();
        });

        let change = subscription.poll(Duration::from_secs(2)).unwrap();
        handle.join().unwrap();
        assert!(change.is_some());
    }

    #[test]
    fn iterator_yields_changes() {
        let store = InMemoryContentStore::new();
        store.create("snaps", fields(json!({ "viewed": false }))).unwrap();
        store.create("snaps", fields(json!({ "viewed": true }))).unwrap();

        let subscription = store.subscribe(Query::collection("snaps")).unwrap();
        let changes: Vec<_> = subscription.take(2).collect::<Result<_, _>>().unwrap();
        assert_eq!(changes.len(), 2);
    }
}
