//! In-process conversation storage.
//!
//! Records live exactly as long as the process; durability is out of scope
//! for this service. The backing map is sharded, so concurrent requests
//! touching different keys never contend on a single lock.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::relay::types::ChatMessage;

/// Title given to records created without one.
pub const DEFAULT_TITLE: &str = "New Conversation";

/// A stored chat transcript with title and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload.
///
/// Caller-supplied ids and timestamps are deliberately not represented here:
/// the store always generates its own, so stray `id` or `created_at` fields
/// in the request body are dropped during deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationDraft {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

/// Update payload. `messages` always replaces the stored list; `title`
/// replaces only when present.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub messages: Vec<ChatMessage>,
}

/// Concurrent keyed map of conversation records.
///
/// Constructed once at startup and shared through `AppState`.
#[derive(Default)]
pub struct ConversationStore {
    records: DashMap<String, Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records, in no particular order.
    pub fn list(&self) -> Vec<Conversation> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }

    pub fn get(&self, id: &str) -> Result<Conversation> {
        self.records
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| Error::NotFound(format!("Conversation '{}' not found", id)))
    }

    /// Store a new record under a freshly generated identifier.
    pub fn create(&self, draft: ConversationDraft) -> Conversation {
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            messages: draft.messages,
            created_at: now,
            updated_at: now,
        };
        self.records
            .insert(conversation.id.clone(), conversation.clone());
        conversation
    }

    /// Replace a record's messages (and optionally its title), or create the
    /// record under the given identifier if it does not exist yet.
    pub fn update(&self, id: &str, update: ConversationUpdate) -> Conversation {
        let now = Utc::now();
        let ConversationUpdate { title, messages } = update;

        let mut entry = self
            .records
            .entry(id.to_string())
            .or_insert_with(|| Conversation {
                id: id.to_string(),
                title: DEFAULT_TITLE.to_string(),
                messages: Vec::new(),
                created_at: now,
                updated_at: now,
            });

        if let Some(title) = title {
            entry.title = title;
        }
        entry.messages = messages;
        entry.updated_at = now;

        entry.clone()
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Conversation '{}' not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    fn draft(title: &str) -> ConversationDraft {
        ConversationDraft {
            title: title.to_string(),
            messages: Vec::new(),
        }
    }

    #[test]
    fn test_create_generates_fresh_ids() {
        let store = ConversationStore::new();
        let a = store.create(draft("First"));
        let b = store.create(draft("Second"));

        assert_ne!(a.id, b.id);
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn test_create_sets_equal_timestamps() {
        let store = ConversationStore::new();
        let conversation = store.create(draft("Demo"));
        assert_eq!(conversation.created_at, conversation.updated_at);
    }

    #[test]
    fn test_draft_ignores_caller_supplied_id_and_timestamps() {
        let json = r#"{
            "id": "attacker-chosen",
            "title": "Demo",
            "messages": [],
            "created_at": "1999-01-01T00:00:00Z",
            "updated_at": "1999-01-01T00:00:00Z"
        }"#;
        let parsed: ConversationDraft = serde_json::from_str(json).unwrap();

        let store = ConversationStore::new();
        let conversation = store.create(parsed);
        assert_ne!(conversation.id, "attacker-chosen");
        assert!(conversation.created_at.timestamp() > 946_684_800); // past 2000-01-01
    }

    #[test]
    fn test_draft_title_defaults() {
        let parsed: ConversationDraft = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.title, DEFAULT_TITLE);
        assert!(parsed.messages.is_empty());
    }

    #[test]
    fn test_get_unknown_id_is_not_found() {
        let store = ConversationStore::new();
        assert!(matches!(store.get("missing"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_update_replaces_messages_and_preserves_title() {
        let store = ConversationStore::new();
        let created = store.create(draft("Demo"));

        let updated = store.update(
            &created.id,
            ConversationUpdate {
                title: None,
                messages: vec![message("user", "hi")],
            },
        );

        assert_eq!(updated.title, "Demo");
        assert_eq!(updated.messages.len(), 1);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn test_update_replaces_title_when_provided() {
        let store = ConversationStore::new();
        let created = store.create(draft("Demo"));

        let updated = store.update(
            &created.id,
            ConversationUpdate {
                title: Some("Renamed".to_string()),
                messages: Vec::new(),
            },
        );

        assert_eq!(updated.title, "Renamed");
    }

    #[test]
    fn test_update_unknown_id_creates_record() {
        let store = ConversationStore::new();

        let created = store.update(
            "client-chosen-id",
            ConversationUpdate {
                title: None,
                messages: vec![message("user", "hello")],
            },
        );

        assert_eq!(created.id, "client-chosen-id");
        assert_eq!(created.title, DEFAULT_TITLE);
        assert_eq!(created.created_at, created.updated_at);

        let fetched = store.get("client-chosen-id").unwrap();
        assert_eq!(fetched.messages.len(), 1);
    }

    #[test]
    fn test_update_unknown_id_uses_provided_title() {
        let store = ConversationStore::new();

        let created = store.update(
            "another-id",
            ConversationUpdate {
                title: Some("Named".to_string()),
                messages: Vec::new(),
            },
        );

        assert_eq!(created.title, "Named");
    }

    #[test]
    fn test_delete_removes_record() {
        let store = ConversationStore::new();
        let created = store.create(draft("Demo"));

        store.delete(&created.id).unwrap();
        assert!(matches!(store.get(&created.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete_unknown_id_is_not_found() {
        let store = ConversationStore::new();
        assert!(matches!(store.delete("missing"), Err(Error::NotFound(_))));
    }
}
