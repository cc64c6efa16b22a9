use crate::gate::{IncorrectPasscode, PasscodeGate};
use crate::leg::{Leg, LegDraft, ValidationError, ORDER_FIELD};
use crate::store::{
    CollectionPath, DocumentId, DocumentStore, Session, Snapshot, StoreError, Subscription,
};
use std::fmt;
use thiserror::Error;

/// Live mirror of the signed-in user's legs, plus the operations that change
/// them.
///
/// Mutations go straight to the store and never touch `legs`; the list is
/// only ever replaced wholesale by the next snapshot the store pushes.
#[derive(Debug)]
pub(crate) struct LegManager<'a, St: ?Sized> {
    store: &'a St,
    app_id: String,
    gate: PasscodeGate,
    auth: Subscription<Option<Session>>,
    session: Option<Session>,
    /// Signed-in user whose collection could not be queried yet
    unqueried: Option<Session>,
    snapshots: Option<Subscription<Snapshot>>,
    legs: Vec<Leg>,
}

impl<'a, St: DocumentStore + ?Sized> LegManager<'a, St> {
    pub(crate) fn new(store: &'a St, app_id: String, gate: PasscodeGate) -> Self {
        LegManager {
            store,
            app_id,
            gate,
            auth: store.auth_state(),
            session: None,
            unqueried: None,
            snapshots: None,
            legs: Vec::new(),
        }
    }

    /// Legs in ascending start date order, as last delivered by the store
    pub(crate) fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub(crate) fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub(crate) fn is_unlocked(&self) -> bool {
        self.gate.is_unlocked()
    }

    pub(crate) fn unlock(&mut self, input: &mut String) -> Result<(), IncorrectPasscode> {
        self.gate.submit(input)
    }

    /// Establish a session if the store does not already have one, using the
    /// pre-issued token when there is one
    pub(crate) fn connect(&mut self, token: Option<&str>) -> Result<(), ManagerError> {
        self.sync()?;
        if self.session.is_none() {
            let session = match token {
                Some(token) => self.store.sign_in_with_token(token),
                None => self.store.sign_in_anonymous(),
            }
            .map_err(ManagerError::Auth)?;
            tracing::info!(user_id = %session.user_id, anonymous = session.anonymous, "Signed in");
            self.sync()?;
        }
        Ok(())
    }

    /// Apply any auth transitions and snapshots delivered since the last
    /// call.  Returns `true` if the leg list was replaced.
    ///
    /// A user only becomes the session once their collection is being
    /// listened to.  If that query fails it is retried on the next call.
    pub(crate) fn sync(&mut self) -> Result<bool, ManagerError> {
        let mut changed = false;
        for state in self.auth.pending() {
            match state {
                Some(session) if self.session.as_ref() != Some(&session) => {
                    changed |= self.leave_session();
                    self.unqueried = Some(session);
                }
                Some(_) => (),
                None => {
                    if self.session.is_some() {
                        tracing::info!("Signed out");
                    }
                    changed |= self.leave_session();
                    self.unqueried = None;
                }
            }
        }
        if let Some(session) = self.unqueried.take() {
            let path = CollectionPath::sailing_routes(&self.app_id, &session.user_id);
            match self.store.query(&path, ORDER_FIELD) {
                Ok(snapshots) => {
                    tracing::info!(path = path.as_str(), "Listening for legs");
                    self.session = Some(session);
                    self.snapshots = Some(snapshots);
                }
                Err(e) => {
                    tracing::warn!(path = path.as_str(), error = %e, "Could not query legs");
                    self.unqueried = Some(session);
                    return Err(ManagerError::Query(e));
                }
            }
        }
        if let Some(snapshot) = self.snapshots.as_ref().and_then(Subscription::latest) {
            self.legs = Leg::from_snapshot(&snapshot);
            tracing::debug!(legs = self.legs.len(), "Applied snapshot");
            changed = true;
        }
        Ok(changed)
    }

    pub(crate) fn add_leg(
        &self,
        name: &str,
        start_date: &str,
        duration_days: &str,
    ) -> Result<DocumentId, ManagerError> {
        self.ensure_unlocked()?;
        let draft = LegDraft::parse(name, start_date, duration_days)?;
        let path = self.collection_path()?;
        let id = self
            .store
            .create(&path, draft.to_fields())
            .map_err(|source| ManagerError::Store {
                action: LegAction::Add,
                source,
            })?;
        tracing::info!(%id, name = %draft.name, "Added leg");
        Ok(id)
    }

    pub(crate) fn update_leg(
        &self,
        id: &DocumentId,
        name: &str,
        start_date: &str,
        duration_days: &str,
    ) -> Result<(), ManagerError> {
        self.ensure_unlocked()?;
        let draft = LegDraft::parse(name, start_date, duration_days)?;
        let path = self.collection_path()?;
        self.store
            .update(&path, id, draft.to_fields())
            .map_err(|source| ManagerError::Store {
                action: LegAction::Update,
                source,
            })?;
        tracing::info!(%id, name = %draft.name, "Updated leg");
        Ok(())
    }

    pub(crate) fn delete_leg(&self, id: &DocumentId) -> Result<(), ManagerError> {
        self.ensure_unlocked()?;
        let path = self.collection_path()?;
        self.store
            .delete(&path, id)
            .map_err(|source| ManagerError::Store {
                action: LegAction::Delete,
                source,
            })?;
        tracing::info!(%id, "Deleted leg");
        Ok(())
    }

    // Forget the current user and their legs.  Returns `true` if any legs
    // were dropped.
    fn leave_session(&mut self) -> bool {
        self.session = None;
        self.snapshots = None;
        let had_legs = !self.legs.is_empty();
        self.legs.clear();
        had_legs
    }

    fn ensure_unlocked(&self) -> Result<(), ManagerError> {
        if self.gate.is_unlocked() {
            Ok(())
        } else {
            Err(ManagerError::Locked)
        }
    }

    fn collection_path(&self) -> Result<CollectionPath, ManagerError> {
        self.session
            .as_ref()
            .map(|s| CollectionPath::sailing_routes(&self.app_id, &s.user_id))
            .ok_or(ManagerError::NotAuthenticated)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum LegAction {
    Add,
    Update,
    Delete,
}

impl fmt::Display for LegAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegAction::Add => f.write_str("add"),
            LegAction::Update => f.write_str("update"),
            LegAction::Delete => f.write_str("delete"),
        }
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub(crate) enum ManagerError {
    #[error("Enter the passcode to make changes.")]
    Locked,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Not signed in yet; try again in a moment.")]
    NotAuthenticated,
    #[error("Failed to {action} leg. Please try again.")]
    Store {
        action: LegAction,
        #[source]
        source: StoreError,
    },
    #[error("Sign-in failed: {0}")]
    Auth(#[source] StoreError),
    #[error("Failed to load legs.")]
    Query(#[source] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::store::MemoryStore;
    use time::macros::date;

    const SECRET: &str = "mainsail";

    fn store() -> MemoryStore {
        MemoryStore::connect(&BackendConfig::default()).unwrap()
    }

    fn manager(store: &MemoryStore) -> LegManager<'_, MemoryStore> {
        LegManager::new(store, String::from("app"), PasscodeGate::new(SECRET))
    }

    fn ready(store: &MemoryStore) -> LegManager<'_, MemoryStore> {
        let mut mgr = manager(store);
        mgr.connect(Some("skipper")).unwrap();
        mgr.unlock(&mut String::from(SECRET)).unwrap();
        mgr
    }

    fn user_path() -> CollectionPath {
        CollectionPath::sailing_routes("app", "skipper")
    }

    fn names<'b, St: DocumentStore + ?Sized>(mgr: &'b LegManager<'_, St>) -> Vec<&'b str> {
        mgr.legs().iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn test_connect_with_token() {
        let store = store();
        let mut mgr = manager(&store);
        mgr.connect(Some("skipper")).unwrap();
        assert_eq!(mgr.session().map(|s| s.user_id.as_str()), Some("skipper"));
        assert!(mgr.legs().is_empty());
    }

    #[test]
    fn test_connect_anonymous() {
        let store = store();
        let mut mgr = manager(&store);
        mgr.connect(None).unwrap();
        assert!(mgr.session().is_some_and(|s| s.anonymous));
    }

    #[test]
    fn test_connect_reuses_existing_session() {
        let store = store();
        let session = store.sign_in_with_token("captain").unwrap();
        let mut mgr = manager(&store);
        mgr.connect(Some("someone-else")).unwrap();
        assert_eq!(mgr.session(), Some(&session));
    }

    #[test]
    fn test_connect_rejected() {
        let store = store();
        let mut mgr = manager(&store);
        assert!(matches!(
            mgr.connect(Some("bad token!")),
            Err(ManagerError::Auth(StoreError::AuthRejected(_)))
        ));
        assert!(mgr.session().is_none());
    }

    #[test]
    fn test_add_leg() {
        let store = store();
        let mut mgr = ready(&store);
        let id = mgr.add_leg("Biscay", "2025-01-05", "7").unwrap();
        // Local state only changes once the snapshot arrives
        assert!(mgr.legs().is_empty());
        assert!(mgr.sync().unwrap());
        let legs = mgr.legs();
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].id, id);
        assert_eq!(legs[0].end_date, date!(2025 - 01 - 12));
        assert!(legs[0].created_at.is_some());
        assert!(!mgr.sync().unwrap());
    }

    #[test]
    fn test_legs_follow_start_date_order() {
        let store = store();
        let mut mgr = ready(&store);
        mgr.add_leg("Azores", "2025-06-10", "5").unwrap();
        mgr.add_leg("Biscay", "2025-05-01", "4").unwrap();
        mgr.add_leg("Canaries", "2025-07-01", "9").unwrap();
        mgr.sync().unwrap();
        assert_eq!(names(&mgr), ["Biscay", "Azores", "Canaries"]);
    }

    #[test]
    fn test_add_leg_validation() {
        let store = store();
        let mgr = ready(&store);
        for (name, start, days) in [
            ("", "2025-01-05", "7"),
            ("Leg", "", "7"),
            ("Leg", "2025-01-05", "0"),
            ("Leg", "2025-01-05", "-1"),
        ] {
            assert!(matches!(
                mgr.add_leg(name, start, days),
                Err(ManagerError::Invalid(_))
            ));
        }
        assert!(store.documents(&user_path()).is_empty());
    }

    #[test]
    fn test_missing_fields_message() {
        let store = store();
        let mgr = ready(&store);
        let e = mgr.add_leg("", "2025-01-05", "7").unwrap_err();
        assert_eq!(e.to_string(), "Please fill in all fields.");
    }

    #[test]
    fn test_locked_manager_refuses_mutation() {
        let store = store();
        let mut mgr = manager(&store);
        mgr.connect(Some("skipper")).unwrap();
        assert_eq!(
            mgr.add_leg("Biscay", "2025-01-05", "7"),
            Err(ManagerError::Locked)
        );
        assert_eq!(
            mgr.delete_leg(&DocumentId::new("x")),
            Err(ManagerError::Locked)
        );
        assert!(store.documents(&user_path()).is_empty());
        assert!(mgr.unlock(&mut String::from("jib")).is_err());
        assert_eq!(
            mgr.add_leg("Biscay", "2025-01-05", "7"),
            Err(ManagerError::Locked)
        );
        mgr.unlock(&mut String::from(SECRET)).unwrap();
        assert!(mgr.add_leg("Biscay", "2025-01-05", "7").is_ok());
    }

    #[test]
    fn test_not_authenticated() {
        let store = store();
        let mut mgr = manager(&store);
        mgr.unlock(&mut String::from(SECRET)).unwrap();
        assert_eq!(
            mgr.add_leg("Biscay", "2025-01-05", "7"),
            Err(ManagerError::NotAuthenticated)
        );
        assert_eq!(
            mgr.add_leg("", "2025-01-05", "7"),
            Err(ManagerError::Invalid(ValidationError::MissingFields))
        );
    }

    #[test]
    fn test_update_replaces_fields() {
        let store = store();
        let mut mgr = ready(&store);
        let id = mgr.add_leg("Biscay", "2025-01-05", "7").unwrap();
        mgr.sync().unwrap();
        mgr.update_leg(&id, "Biscay (slow)", "2025-01-06", "10")
            .unwrap();
        mgr.sync().unwrap();
        let leg = &mgr.legs()[0];
        assert_eq!(leg.id, id);
        assert_eq!(leg.name, "Biscay (slow)");
        assert_eq!(leg.start_date, date!(2025 - 01 - 06));
        assert_eq!(leg.end_date, date!(2025 - 01 - 16));
        assert_eq!(leg.duration_days, 10);
    }

    #[test]
    fn test_update_validation_leaves_record() {
        let store = store();
        let mut mgr = ready(&store);
        let id = mgr.add_leg("Biscay", "2025-01-05", "7").unwrap();
        mgr.sync().unwrap();
        assert!(matches!(
            mgr.update_leg(&id, "Biscay", "2025-01-05", "0"),
            Err(ManagerError::Invalid(ValidationError::Duration))
        ));
        assert!(!mgr.sync().unwrap());
        assert_eq!(mgr.legs()[0].duration_days, 7);
    }

    #[test]
    fn test_delete_leg() {
        let store = store();
        let mut mgr = ready(&store);
        let a = mgr.add_leg("A", "2025-01-05", "7").unwrap();
        mgr.add_leg("B", "2025-02-05", "7").unwrap();
        mgr.sync().unwrap();
        mgr.delete_leg(&a).unwrap();
        mgr.sync().unwrap();
        assert_eq!(names(&mgr), ["B"]);
    }

    #[test]
    fn test_store_failure_keeps_state() {
        let store = store();
        let mut mgr = ready(&store);
        let id = mgr.add_leg("A", "2025-01-05", "7").unwrap();
        mgr.sync().unwrap();
        store.set_offline(true);
        let e = mgr.add_leg("B", "2025-02-05", "7").unwrap_err();
        assert_eq!(e.to_string(), "Failed to add leg. Please try again.");
        assert!(matches!(
            mgr.delete_leg(&id),
            Err(ManagerError::Store {
                action: LegAction::Delete,
                source: StoreError::Unavailable,
            })
        ));
        assert!(!mgr.sync().unwrap());
        assert_eq!(names(&mgr), ["A"]);
    }

    #[test]
    fn test_delete_missing_leg() {
        let store = store();
        let mgr = ready(&store);
        assert!(matches!(
            mgr.delete_leg(&DocumentId::new("gone")),
            Err(ManagerError::Store {
                action: LegAction::Delete,
                source: StoreError::NotFound { .. },
            })
        ));
    }

    #[test]
    fn test_snapshots_replace_not_merge() {
        let store = store();
        let mut mgr = ready(&store);
        mgr.add_leg("A", "2025-01-05", "7").unwrap();
        mgr.sync().unwrap();
        // Another client removes everything behind our back
        for doc in store.documents(&user_path()) {
            store.delete(&user_path(), &doc.id).unwrap();
        }
        store
            .create(
                &user_path(),
                LegDraft::parse("Z", "2025-03-01", "2").unwrap().to_fields(),
            )
            .unwrap();
        assert!(mgr.sync().unwrap());
        assert_eq!(names(&mgr), ["Z"]);
    }

    #[test]
    fn test_failed_query_does_not_mix_users() {
        let store = store();
        let mut mgr = ready(&store);
        mgr.add_leg("A-leg", "2025-01-05", "7").unwrap();
        mgr.sync().unwrap();
        store.sign_in_with_token("bob").unwrap();
        store.set_offline(true);
        assert!(matches!(
            mgr.sync(),
            Err(ManagerError::Query(StoreError::Unavailable))
        ));
        // Neither the old user's legs nor the old collection stay in use
        assert!(mgr.legs().is_empty());
        assert!(mgr.session().is_none());
        store.set_offline(false);
        assert_eq!(
            mgr.add_leg("B-leg", "2025-02-05", "3"),
            Err(ManagerError::NotAuthenticated)
        );
        mgr.sync().unwrap();
        assert_eq!(mgr.session().map(|s| s.user_id.as_str()), Some("bob"));
        mgr.add_leg("B-leg", "2025-02-05", "3").unwrap();
        mgr.sync().unwrap();
        assert_eq!(names(&mgr), ["B-leg"]);
        let bob = CollectionPath::sailing_routes("app", "bob");
        assert_eq!(store.documents(&bob).len(), 1);
        assert_eq!(store.documents(&user_path()).len(), 1);
    }

    #[test]
    fn test_switching_users_swaps_legs() {
        let store = store();
        let mut mgr = ready(&store);
        mgr.add_leg("A-leg", "2025-01-05", "7").unwrap();
        mgr.sync().unwrap();
        store.sign_in_with_token("bob").unwrap();
        assert!(mgr.sync().unwrap());
        assert!(mgr.legs().is_empty());
        assert_eq!(mgr.session().map(|s| s.user_id.as_str()), Some("bob"));
    }

    #[test]
    fn test_users_are_isolated() {
        let store = store();
        store
            .create(
                &CollectionPath::sailing_routes("app", "other"),
                LegDraft::parse("Theirs", "2025-03-01", "2").unwrap().to_fields(),
            )
            .unwrap();
        let mut mgr = ready(&store);
        mgr.sync().unwrap();
        assert!(mgr.legs().is_empty());
    }
}
