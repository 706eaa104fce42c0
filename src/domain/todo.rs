use uuid::Uuid;

/// Session-scoped handle for a record. Never persisted; reassigned on every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(pub Uuid);

impl Default for RecordId {
    fn default() -> Self { Self(Uuid::new_v4()) }
}

/// One to-do entry. Its identity is its position in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoRecord {
    pub text: String,
    pub completed: bool,
}

impl TodoRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), completed: false }
    }
}
