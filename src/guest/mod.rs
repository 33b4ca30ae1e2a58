/// In-memory guest drafts
///
/// Anonymous visitors can sketch lists before registering; the frontend
/// tags them with an `X-Session-Id` header and imports them after login.
/// Drafts are process-local and vanish on restart, which is fine: the
/// import endpoint is the only consumer.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// A draft list held for a guest session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestList {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
}

/// A draft item held for a guest session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestItem {
    pub id: i64,
    #[serde(rename = "list_id")]
    pub list_id: i64,
    pub name: String,
    pub count: f64,
    pub purchased: bool,
}

#[derive(Default)]
struct GuestState {
    lists: HashMap<String, HashMap<i64, GuestList>>,
    items: HashMap<String, HashMap<i64, Vec<GuestItem>>>,
    next_list_id: i64,
    next_item_id: i64,
}

/// Store for guest-mode drafts, keyed by the client session id
pub struct GuestStore {
    state: Mutex<GuestState>,
}

impl GuestStore {
    /// Create an empty guest store
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GuestState::default()),
        }
    }

    /// Add a draft list for a guest session and assign it an id
    pub fn add_list(&self, session_id: &str, name: String) -> GuestList {
        let mut state = self.state.lock().unwrap();

        state.next_list_id += 1;
        let list = GuestList {
            id: state.next_list_id,
            name,
        };

        state
            .lists
            .entry(session_id.to_string())
            .or_default()
            .insert(list.id, list.clone());

        list
    }

    /// All draft lists of a guest session, oldest first
    pub fn lists(&self, session_id: &str) -> Vec<GuestList> {
        let state = self.state.lock().unwrap();

        let mut lists: Vec<GuestList> = state
            .lists
            .get(session_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        lists.sort_by_key(|l| l.id);

        lists
    }

    /// Drop all draft lists of a guest session
    pub fn clear_lists(&self, session_id: &str) {
        self.state.lock().unwrap().lists.remove(session_id);
    }

    /// Add a draft item to one of the session's draft lists
    pub fn add_item(
        &self,
        session_id: &str,
        list_id: i64,
        name: String,
        count: f64,
        purchased: bool,
    ) -> GuestItem {
        let mut state = self.state.lock().unwrap();

        state.next_item_id += 1;
        let item = GuestItem {
            id: state.next_item_id,
            list_id,
            name,
            count,
            purchased,
        };

        state
            .items
            .entry(session_id.to_string())
            .or_default()
            .entry(list_id)
            .or_default()
            .push(item.clone());

        item
    }

    /// Draft items of one draft list
    pub fn items(&self, session_id: &str, list_id: i64) -> Vec<GuestItem> {
        let state = self.state.lock().unwrap();

        state
            .items
            .get(session_id)
            .and_then(|m| m.get(&list_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Drop all draft items of a guest session
    pub fn clear_items(&self, session_id: &str) {
        self.state.lock().unwrap().items.remove(session_id);
    }
}

impl Default for GuestStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_isolated() {
        let store = GuestStore::new();

        let a = store.add_list("session-a", "groceries".to_string());
        store.add_list("session-b", "tools".to_string());

        let lists = store.lists("session-a");
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].id, a.id);
        assert_eq!(store.lists("session-c").len(), 0);
    }

    #[test]
    fn items_attach_to_their_draft_list() {
        let store = GuestStore::new();

        let list = store.add_list("s", "groceries".to_string());
        store.add_item("s", list.id, "milk".to_string(), 1.0, false);
        store.add_item("s", list.id, "eggs".to_string(), 10.0, false);
        store.add_item("s", list.id + 1, "elsewhere".to_string(), 1.0, false);

        let items = store.items("s", list.id);
        assert_eq!(items.len(), 2);
        assert!(items[0].id < items[1].id);
    }

    #[test]
    fn clearing_forgets_the_session() {
        let store = GuestStore::new();

        let list = store.add_list("s", "groceries".to_string());
        store.add_item("s", list.id, "milk".to_string(), 1.0, false);

        store.clear_lists("s");
        store.clear_items("s");

        assert!(store.lists("s").is_empty());
        assert!(store.items("s", list.id).is_empty());
    }
}
