use chrono::{DateTime, Utc};

/// Opaque per-discovery identifier. Re-fetching the same real-world event
/// produces a fresh id, so never use it for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "evt-{}", self.0)
    }
}

/// A normalized event as handed over by the scan pipeline, before the store
/// assigns an id and discovery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub location: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source_url: Option<String>,
}

impl EventDraft {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.title, self.start)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampusEvent {
    pub id: EventId,
    pub title: String,
    pub location: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source_url: Option<String>,
    pub found_at: DateTime<Utc>,
}

impl CampusEvent {
    pub(crate) fn from_draft(id: EventId, draft: EventDraft, found_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            location: draft.location,
            description: draft.description,
            start: draft.start,
            end: draft.end,
            source_url: draft.source_url,
            found_at,
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.title, self.start)
    }
}

/// Identity of "the same real-world event" across fetches: exact title plus
/// start instant. Location and end time are not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    title: String,
    start: DateTime<Utc>,
}

impl DedupKey {
    pub fn new(title: &str, start: DateTime<Utc>) -> Self {
        Self {
            title: title.to_string(),
            start,
        }
    }
}
