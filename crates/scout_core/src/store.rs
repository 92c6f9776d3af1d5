use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};

use crate::event::{CampusEvent, DedupKey, EventDraft, EventId};

/// Discovered events, most recently found first. No two entries share a
/// [`DedupKey`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventStore {
    events: Vec<CampusEvent>,
    keys: HashSet<DedupKey>,
    next_id: u64,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fetched batch, returning how many events were actually added.
    ///
    /// Candidates whose key is already stored, or repeated earlier in the same
    /// batch, are discarded. New events keep their batch order and are placed
    /// ahead of everything previously stored.
    pub fn merge(&mut self, batch: Vec<EventDraft>, found_at: DateTime<Utc>) -> usize {
        let mut fresh = Vec::new();
        for draft in batch {
            if !self.keys.insert(draft.dedup_key()) {
                continue;
            }
            self.next_id += 1;
            fresh.push(CampusEvent::from_draft(EventId(self.next_id), draft, found_at));
        }
        let added = fresh.len();
        if added > 0 {
            self.events.splice(0..0, fresh);
        }
        added
    }

    pub fn events(&self) -> &[CampusEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: EventId) -> Option<&CampusEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.get(id).is_some()
    }
}

/// Ids of store entries picked by the user for export.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    ids: BTreeSet<EventId>,
}

impl Selection {
    /// Flip one id. Unknown ids are ignored.
    pub fn toggle(&mut self, id: EventId, store: &EventStore) -> bool {
        if !store.contains(id) {
            return false;
        }
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
        true
    }

    /// Select every stored event, or clear when everything is already selected.
    pub fn toggle_all(&mut self, store: &EventStore) {
        if !store.is_empty() && self.ids.len() == store.len() {
            self.ids.clear();
        } else {
            self.ids = store.events().iter().map(|event| event.id).collect();
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids that no longer refer to a stored event.
    pub fn prune(&mut self, store: &EventStore) {
        self.ids.retain(|id| store.contains(*id));
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected events in store order.
    pub fn selected_events(&self, store: &EventStore) -> Vec<CampusEvent> {
        store
            .events()
            .iter()
            .filter(|event| self.ids.contains(&event.id))
            .cloned()
            .collect()
    }
}
