//! Typed records stored as content-store documents.
//!
//! ## Example
//!
//! ```ignore
//! use snap_lifecycle::Record;
//!
//! #[derive(Clone, Serialize, Deserialize, Record)]
//! #[record(collection = "snaps")]
//! struct Snap {
//!     #[record(id)]
//!     pub id: String,
//!     pub viewed: bool,
//! }
//! ```

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::store::{Document, DocumentRef};

/// Trait for types that live in a content-store collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection name (e.g. "snaps", "users").
    const COLLECTION: &'static str;

    /// Name of the field holding the document id. Decoding fills it from
    /// the document reference, so store-assigned ids round-trip.
    const ID_FIELD: &'static str;

    fn id(&self) -> &str;

    /// Reference to this record's document.
    fn reference(&self) -> DocumentRef {
        DocumentRef::new(Self::COLLECTION, self.id())
    }

    /// Serialize into document fields.
    fn to_fields(&self) -> Result<Map<String, Value>, StoreError> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(StoreError::Serde(format!(
                "{} did not serialize to an object: {}",
                Self::COLLECTION,
                other
            ))),
        }
    }

    /// Decode a record from a document of this collection.
    fn from_document(document: &Document) -> Result<Self, StoreError> {
        if document.reference.collection != Self::COLLECTION {
            return Err(StoreError::Serde(format!(
                "expected a {} document, got {}",
                Self::COLLECTION,
                document.reference
            )));
        }
        let mut fields = document.fields.clone();
        fields.insert(
            Self::ID_FIELD.to_string(),
            Value::String(document.reference.id.clone()),
        );
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}
