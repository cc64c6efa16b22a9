//! Interface to the hosted document database that holds each user's legs,
//! together with an in-process implementation of it.
mod memory;
pub(crate) use self::memory::MemoryStore;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::mpsc::{Receiver, TryRecvError};
use thiserror::Error;

/// Field name under which the store records a document's creation time
pub(crate) const CREATED_AT_FIELD: &str = "createdAt";

pub(crate) type Fields = Map<String, Value>;

/// Opaque identifier assigned to a document by the store
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct DocumentId(String);

impl DocumentId {
    pub(crate) fn new<S: Into<String>>(id: S) -> DocumentId {
        DocumentId(id.into())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Document {
    pub(crate) id: DocumentId,
    pub(crate) fields: Fields,
}

/// An authenticated user session
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(crate) struct Session {
    pub(crate) user_id: String,
    pub(crate) anonymous: bool,
}

/// Location of a collection, scoped per application and per user
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct CollectionPath(String);

impl CollectionPath {
    pub(crate) fn sailing_routes(app_id: &str, user_id: &str) -> CollectionPath {
        CollectionPath(format!("apps/{app_id}/users/{user_id}/sailing_routes"))
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A full view of a collection's documents, in query order
pub(crate) type Snapshot = Vec<Document>;

/// The backend that authenticates users and stores their documents.
///
/// Realtime listeners are modelled as [`Subscription`]s: every change to a
/// queried collection delivers a complete new snapshot, never a delta.
pub(crate) trait DocumentStore {
    /// Subscribe to authentication transitions.  The current state is
    /// delivered first.
    fn auth_state(&self) -> Subscription<Option<Session>>;

    fn sign_in_anonymous(&self) -> Result<Session, StoreError>;

    fn sign_in_with_token(&self, token: &str) -> Result<Session, StoreError>;

    /// Subscribe to a collection ordered by the given field.  The current
    /// contents are delivered first.
    fn query(
        &self,
        path: &CollectionPath,
        order_by: &str,
    ) -> Result<Subscription<Snapshot>, StoreError>;

    fn create(&self, path: &CollectionPath, fields: Fields) -> Result<DocumentId, StoreError>;

    fn update(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), StoreError>;

    fn delete(&self, path: &CollectionPath, id: &DocumentId) -> Result<(), StoreError>;
}

/// Receiving end of a realtime listener.
///
/// As an iterator it is the unending sequence of full snapshots: `next`
/// blocks until the store delivers one and ends only once the store has gone
/// away.  The UI loop never blocks and uses `pending`/`latest` instead.
#[derive(Debug)]
pub(crate) struct Subscription<T>(Receiver<T>);

impl<T> Subscription<T> {
    pub(crate) fn new(receiver: Receiver<T>) -> Subscription<T> {
        Subscription(receiver)
    }

    /// Drain everything delivered so far, returning only the newest item
    pub(crate) fn latest(&self) -> Option<T> {
        let mut newest = None;
        loop {
            match self.0.try_recv() {
                Ok(item) => newest = Some(item),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return newest,
            }
        }
    }

    /// Drain everything delivered so far, in order
    pub(crate) fn pending(&self) -> Vec<T> {
        self.0.try_iter().collect()
    }
}

impl<T> Iterator for Subscription<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.recv().ok()
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub(crate) enum StoreError {
    #[error("backend is misconfigured: {0}")]
    Misconfigured(String),

    #[error("sign-in rejected: {0}")]
    AuthRejected(String),

    #[error("no document {id} in {path}")]
    NotFound { path: String, id: DocumentId },

    #[error("backend is unavailable")]
    Unavailable,
}
