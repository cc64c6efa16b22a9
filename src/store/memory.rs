use super::{
    CollectionPath, Document, DocumentId, DocumentStore, Fields, Session, Snapshot, StoreError,
    Subscription, CREATED_AT_FIELD,
};
use crate::config::BackendConfig;
use serde_json::Value;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::mpsc::{channel, Sender};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

/// A document store living inside the current process.
///
/// It honors the same contract as the hosted backend: ids and creation
/// timestamps are assigned by the store, queries are ordered, and every
/// change is pushed to the listeners of the affected collection as a full
/// snapshot.
#[derive(Debug)]
pub(crate) struct MemoryStore {
    project_id: String,
    state: RefCell<State>,
}

#[derive(Debug, Default)]
struct State {
    session: Option<Session>,
    auth_listeners: Vec<Sender<Option<Session>>>,
    collections: HashMap<CollectionPath, Collection>,
    offline: bool,
}

#[derive(Debug, Default)]
struct Collection {
    documents: Vec<Document>,
    listeners: Vec<Listener>,
}

#[derive(Debug)]
struct Listener {
    order_by: String,
    sender: Sender<Snapshot>,
}

impl MemoryStore {
    pub(crate) fn connect(config: &BackendConfig) -> Result<MemoryStore, StoreError> {
        if config.project_id.trim().is_empty() {
            return Err(StoreError::Misconfigured(String::from(
                "project ID must not be empty",
            )));
        }
        tracing::info!(
            project_id = %config.project_id,
            has_api_key = config.api_key.is_some(),
            "Connected to in-process document store"
        );
        Ok(MemoryStore {
            project_id: config.project_id.clone(),
            state: RefCell::new(State::default()),
        })
    }

    pub(crate) fn project_id(&self) -> &str {
        &self.project_id
    }

    #[cfg(test)]
    pub(crate) fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    #[cfg(test)]
    pub(crate) fn documents(&self, path: &CollectionPath) -> Vec<Document> {
        self.state
            .borrow()
            .collections
            .get(path)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    fn with_state<T, F>(&self, func: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut State) -> Result<T, StoreError>,
    {
        let mut state = self
            .state
            .try_borrow_mut()
            .map_err(|_| StoreError::Unavailable)?;
        if state.offline {
            return Err(StoreError::Unavailable);
        }
        func(&mut *state)
    }

    fn sign_in(&self, session: Session) -> Result<Session, StoreError> {
        self.with_state(|state| {
            if state.session.as_ref() != Some(&session) {
                state.session = Some(session.clone());
                state
                    .auth_listeners
                    .retain(|tx| tx.send(Some(session.clone())).is_ok());
            }
            Ok(session)
        })
    }
}

impl DocumentStore for MemoryStore {
    fn auth_state(&self) -> Subscription<Option<Session>> {
        let (tx, rx) = channel();
        if let Ok(mut state) = self.state.try_borrow_mut() {
            if tx.send(state.session.clone()).is_ok() {
                state.auth_listeners.push(tx);
            }
        }
        Subscription::new(rx)
    }

    fn sign_in_anonymous(&self) -> Result<Session, StoreError> {
        let session = Session {
            user_id: Uuid::new_v4().simple().to_string(),
            anonymous: true,
        };
        self.sign_in(session)
    }

    fn sign_in_with_token(&self, token: &str) -> Result<Session, StoreError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(StoreError::AuthRejected(String::from("empty token")));
        }
        if !token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        {
            return Err(StoreError::AuthRejected(String::from(
                "token contains invalid characters",
            )));
        }
        self.sign_in(Session {
            user_id: token.to_owned(),
            anonymous: false,
        })
    }

    fn query(
        &self,
        path: &CollectionPath,
        order_by: &str,
    ) -> Result<Subscription<Snapshot>, StoreError> {
        self.with_state(|state| {
            let (tx, rx) = channel();
            let collection = state.collections.entry(path.clone()).or_default();
            let listener = Listener {
                order_by: order_by.to_owned(),
                sender: tx,
            };
            if listener.send(&collection.documents) {
                collection.listeners.push(listener);
            }
            Ok(Subscription::new(rx))
        })
    }

    fn create(&self, path: &CollectionPath, mut fields: Fields) -> Result<DocumentId, StoreError> {
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| StoreError::Misconfigured(e.to_string()))?;
        fields.insert(CREATED_AT_FIELD.to_owned(), Value::String(created_at));
        self.with_state(|state| {
            let id = DocumentId::new(Uuid::new_v4().simple().to_string());
            let collection = state.collections.entry(path.clone()).or_default();
            collection.documents.push(Document {
                id: id.clone(),
                fields,
            });
            collection.notify();
            Ok(id)
        })
    }

    fn update(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.with_state(|state| {
            let not_found = || StoreError::NotFound {
                path: path.to_string(),
                id: id.clone(),
            };
            let collection = state.collections.get_mut(path).ok_or_else(not_found)?;
            let doc = collection
                .documents
                .iter_mut()
                .find(|d| &d.id == id)
                .ok_or_else(not_found)?;
            // Merge so that store-assigned fields survive a rewrite
            doc.fields.extend(fields);
            collection.notify();
            Ok(())
        })
    }

    fn delete(&self, path: &CollectionPath, id: &DocumentId) -> Result<(), StoreError> {
        self.with_state(|state| {
            let not_found = || StoreError::NotFound {
                path: path.to_string(),
                id: id.clone(),
            };
            let collection = state.collections.get_mut(path).ok_or_else(not_found)?;
            let before = collection.documents.len();
            collection.documents.retain(|d| &d.id != id);
            if collection.documents.len() == before {
                return Err(not_found());
            }
            collection.notify();
            Ok(())
        })
    }
}

impl Collection {
    fn notify(&mut self) {
        let documents = &self.documents;
        self.listeners.retain(|l| l.send(documents));
    }
}

impl Listener {
    // Returns `false` if the receiving end has been dropped
    fn send(&self, documents: &[Document]) -> bool {
        let mut snapshot = documents.to_vec();
        snapshot.sort_by(|a, b| {
            compare_fields(a.fields.get(&self.order_by), b.fields.get(&self.order_by))
        });
        self.sender.send(snapshot).is_ok()
    }
}

// Missing values sort first, then numbers, then strings.  Equal keys keep
// insertion order since `sort_by` is stable.
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => rank(a).cmp(&rank(b)),
    }
}
