use crate::domain::error::{StoreError, StoreResult};
use crate::domain::storage::{KeyValueStorage, COMPLETED_KEY, TODOS_KEY};
use crate::domain::todo::{RecordId, TodoRecord};

/// Ordered to-do records backed by two parallel persisted sequences.
///
/// Position `i` addresses `texts[i]`, `completed[i]` and `ids[i]` together; all
/// three always have the same length. Every mutation writes both persisted
/// sequences in one grouped write, or rolls back to its pre-call state.
pub struct TodoStore<S: KeyValueStorage> {
    storage: S,
    texts: Vec<String>,
    completed: Vec<bool>,
    ids: Vec<RecordId>,
}

struct Snapshot {
    texts: Vec<String>,
    completed: Vec<bool>,
    ids: Vec<RecordId>,
}

impl<S: KeyValueStorage> TodoStore<S> {
    /// Empty store; nothing is read until [`TodoStore::load`].
    pub fn new(storage: S) -> Self {
        Self { storage, texts: Vec::new(), completed: Vec::new(), ids: Vec::new() }
    }

    /// Builds a store and loads whatever `storage` already holds.
    pub async fn open(storage: S) -> StoreResult<Self> {
        let mut store = Self::new(storage);
        store.load().await?;
        Ok(store)
    }

    pub fn storage(&self) -> &S { &self.storage }

    /// Replaces the in-memory state with the persisted one.
    ///
    /// Missing entries read as empty. When the two sequences disagree in
    /// length the shorter wins; storage itself is left as found.
    pub async fn load(&mut self) -> StoreResult<Vec<TodoRecord>> {
        let mut texts: Vec<String> = self.read_entry(TODOS_KEY).await?;
        let mut completed: Vec<bool> = self.read_entry(COMPLETED_KEY).await?;

        if texts.len() != completed.len() {
            let len = texts.len().min(completed.len());
            tracing::warn!(todos = texts.len(), completed = completed.len(), kept = len, "persisted sequences disagree in length, truncating");
            texts.truncate(len);
            completed.truncate(len);
        }

        self.ids = texts.iter().map(|_| RecordId::default()).collect();
        self.texts = texts;
        self.completed = completed;
        tracing::info!(count = self.texts.len(), "loaded todos");
        Ok(self.records())
    }

    /// Appends `text` as not completed and returns its position.
    pub async fn add(&mut self, text: impl Into<String>) -> StoreResult<usize> {
        let snapshot = self.snapshot();
        let position = self.texts.len();
        self.texts.push(text.into());
        self.completed.push(false);
        self.ids.push(RecordId::default());
        self.persist(snapshot).await?;
        tracing::debug!(position, "added todo");
        Ok(position)
    }

    /// Replaces the text at `position`; editing always clears completion.
    pub async fn update(&mut self, position: usize, text: impl Into<String>) -> StoreResult<()> {
        self.check(position)?;
        let snapshot = self.snapshot();
        self.texts[position] = text.into();
        self.completed[position] = false;
        self.persist(snapshot).await?;
        tracing::debug!(position, "updated todo");
        Ok(())
    }

    /// Deletes the record at `position`; later records shift down by one.
    pub async fn remove(&mut self, position: usize) -> StoreResult<TodoRecord> {
        self.check(position)?;
        let snapshot = self.snapshot();
        let text = self.texts.remove(position);
        let completed = self.completed.remove(position);
        self.ids.remove(position);
        self.persist(snapshot).await?;
        tracing::debug!(position, "removed todo");
        Ok(TodoRecord { text, completed })
    }

    /// Flips completion at `position` and returns the new value.
    pub async fn toggle(&mut self, position: usize) -> StoreResult<bool> {
        self.check(position)?;
        let snapshot = self.snapshot();
        let value = !self.completed[position];
        self.completed[position] = value;
        self.persist(snapshot).await?;
        tracing::debug!(position, completed = value, "toggled todo");
        Ok(value)
    }

    /// Drops every record and both persisted entries.
    pub async fn clear(&mut self) -> StoreResult<()> {
        self.storage
            .remove_all(&[TODOS_KEY, COMPLETED_KEY])
            .await
            .map_err(StoreError::StorageUnavailable)?;
        self.texts.clear();
        self.completed.clear();
        self.ids.clear();
        tracing::info!("cleared todos");
        Ok(())
    }

    pub fn count(&self) -> usize { self.texts.len() }

    pub fn is_empty(&self) -> bool { self.texts.is_empty() }

    pub fn get(&self, position: usize) -> Option<TodoRecord> {
        let text = self.texts.get(position)?;
        Some(TodoRecord { text: text.clone(), completed: self.completed[position] })
    }

    pub fn records(&self) -> Vec<TodoRecord> {
        self.texts
            .iter()
            .zip(&self.completed)
            .map(|(text, &completed)| TodoRecord { text: text.clone(), completed })
            .collect()
    }

    pub fn id_at(&self, position: usize) -> Option<RecordId> { self.ids.get(position).copied() }

    /// Current position of `id`, which moves whenever an earlier record is removed.
    pub fn position_of(&self, id: RecordId) -> Option<usize> {
        self.ids.iter().position(|&candidate| candidate == id)
    }

    fn check(&self, position: usize) -> StoreResult<()> {
        if position < self.texts.len() {
            Ok(())
        } else {
            Err(StoreError::OutOfRange { position, len: self.texts.len() })
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot { texts: self.texts.clone(), completed: self.completed.clone(), ids: self.ids.clone() }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.texts = snapshot.texts;
        self.completed = snapshot.completed;
        self.ids = snapshot.ids;
    }

    async fn persist(&mut self, snapshot: Snapshot) -> StoreResult<()> {
        debug_assert_eq!(self.texts.len(), self.completed.len());
        let entries = match (serde_json::to_string(&self.texts), serde_json::to_string(&self.completed)) {
            (Ok(todos), Ok(completed)) => [(TODOS_KEY, todos), (COMPLETED_KEY, completed)],
            (Err(e), _) | (_, Err(e)) => {
                self.restore(snapshot);
                return Err(StoreError::StorageUnavailable(e.into()));
            }
        };
        if let Err(e) = self.storage.set_all(&entries).await {
            tracing::warn!(error = %e, "persisting todos failed, rolling back");
            self.restore(snapshot);
            return Err(StoreError::StorageUnavailable(e));
        }
        Ok(())
    }

    async fn read_entry<T: serde::de::DeserializeOwned + Default>(&self, key: &'static str) -> StoreResult<T> {
        let raw = self.storage.get(key).await.map_err(StoreError::StorageUnavailable)?;
        match raw {
            None => Ok(T::default()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::CorruptEntry { key, source }),
        }
    }
}
