//! Publishing the node's own events.
//!
//! A publish signs the event with the node identity, ingests it locally,
//! hands it to the [`Broadcaster`] and queues whichever peers did not
//! confirm for the resend sweep.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use murmur_shared::constants::{KIND_PROFILE, KIND_TEXT_NOTE};
use murmur_shared::identity::Identity;
use murmur_shared::{Event, ProfileContent, Pubkey64};
use murmur_store::Database;
use tracing::info;

use crate::broadcast::Broadcaster;
use crate::error::NodeError;

pub struct Publisher {
    identity: Identity,
    store: Arc<Database>,
    broadcaster: Arc<dyn Broadcaster>,
    own_profile: Mutex<Option<Event>>,
}

impl Publisher {
    pub fn new(identity: Identity, store: Arc<Database>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            identity,
            store,
            broadcaster,
            own_profile: Mutex::new(None),
        }
    }

    pub fn author_key(&self) -> Pubkey64 {
        self.identity.pubkey64()
    }

    /// Publish a text note.
    pub fn post_note(&self, content: &str) -> Result<Event, NodeError> {
        if content.is_empty() {
            return Err(NodeError::BadRequest("Content is required".into()));
        }

        let event = self.publish(KIND_TEXT_NOTE, content.to_string())?;
        info!(
            author = %event.pubkey.short(),
            created_at = event.created_at,
            content = %event.content,
            "posted note"
        );
        Ok(event)
    }

    /// Publish a profile update and remember it as the node's own profile.
    pub fn update_profile(&self, profile: &ProfileContent) -> Result<Event, NodeError> {
        if profile.name.is_empty() {
            return Err(NodeError::BadRequest("Name is required".into()));
        }

        let event = self.publish(KIND_PROFILE, profile.to_json())?;
        *self.own_profile.lock().unwrap_or_else(|e| e.into_inner()) = Some(event.clone());

        info!(name = %profile.name, id = %event.id, "updated own profile");
        Ok(event)
    }

    /// The last profile this node published during this run.
    pub fn own_profile(&self) -> Option<Event> {
        self.own_profile
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn publish(&self, kind: u16, content: String) -> Result<Event, NodeError> {
        let event = self
            .identity
            .sign_event(kind, Vec::new(), content, Utc::now().timestamp())?;
        self.store.try_ingest(&event)?;

        let unconfirmed = self.broadcaster.broadcast(&event);
        if !unconfirmed.is_empty() {
            self.store
                .try_add_resend_needed_event(&unconfirmed, &event, true)?;
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use murmur_shared::identity::verify_event;
    use murmur_store::EventStore;

    use super::*;
    use crate::broadcast::scripted::{peers, Scripted};
    use crate::broadcast::Standalone;

    fn publisher_with(broadcaster: Arc<dyn Broadcaster>) -> (Publisher, Arc<Database>) {
        let store = Arc::new(Database::open_in_memory().unwrap());
        let publisher = Publisher::new(Identity::generate(), store.clone(), broadcaster);
        (publisher, store)
    }

    #[test]
    fn test_post_note_is_signed_and_stored() {
        let (publisher, store) = publisher_with(Arc::new(Standalone));
        let event = publisher.post_note("hello murmur").unwrap();

        assert_eq!(event.kind, KIND_TEXT_NOTE);
        assert_eq!(event.author_key(), publisher.author_key());
        assert!(verify_event(&event).is_ok());
        assert_eq!(store.get_event_by_id(&event.id), Some(event));
        assert!(store.resend_needed_events().is_empty());
    }

    #[test]
    fn test_empty_note_is_rejected() {
        let (publisher, store) = publisher_with(Arc::new(Standalone));
        assert!(matches!(
            publisher.post_note(""),
            Err(NodeError::BadRequest(_))
        ));
        assert_eq!(store.try_ledger_len().unwrap(), 0);
    }

    #[test]
    fn test_unconfirmed_peers_are_queued() {
        let (publisher, store) = publisher_with(Arc::new(Scripted::new(&[0xA, 0xB], &[])));
        let event = publisher.post_note("are you there").unwrap();

        let mut queue = store.resend_needed_events();
        assert_eq!(queue.len(), 1);
        assert!(queue.advance());
        let record = queue.current().unwrap();
        assert_eq!(record.event_id, event.id);
        assert_eq!(record.dest_ids, peers(&[0xA, 0xB]));
    }

    #[test]
    fn test_update_profile_indexes_and_remembers() {
        let (publisher, store) = publisher_with(Arc::new(Standalone));
        assert!(publisher.own_profile().is_none());

        let profile = ProfileContent {
            name: "alice".into(),
            about: "first".into(),
            picture: String::new(),
        };
        let event = publisher.update_profile(&profile).unwrap();

        assert_eq!(publisher.own_profile(), Some(event.clone()));
        let stored = store.get_profile_local(publisher.author_key()).unwrap();
        assert_eq!(ProfileContent::from_event(&stored), Some(profile));
    }

    #[test]
    fn test_profile_without_name_is_rejected() {
        let (publisher, _store) = publisher_with(Arc::new(Standalone));
        let err = publisher.update_profile(&ProfileContent::default()).unwrap_err();
        assert!(matches!(err, NodeError::BadRequest(_)));
        assert!(publisher.own_profile().is_none());
    }
}
