use super::todo_store::TodoStore;
use crate::domain::error::{StoreError, StoreResult};
use crate::domain::filter::{visible_positions, Filter};
use crate::domain::storage::KeyValueStorage;
use crate::domain::todo::TodoRecord;

/// What saving an edit does to the active filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterResetPolicy {
    #[default]
    Keep,
    ResetToAll,
}

/// User intents, already resolved to store positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Toggle(usize),
    Edit(usize),
    Save(usize, String),
    CancelEdit,
    Delete(usize),
    SetFilter(Filter),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added(usize),
    Toggled(usize, bool),
    Editing(usize),
    Saved(usize),
    EditCancelled,
    Deleted(usize),
    FilterChanged(Filter),
}

/// Applies commands to a [`TodoStore`] one at a time and tracks the view state
/// around it: the active filter and the single open inline editor.
pub struct TodoController<S: KeyValueStorage> {
    store: TodoStore<S>,
    filter: Filter,
    editing: Option<usize>,
    on_save: FilterResetPolicy,
}

impl<S: KeyValueStorage> TodoController<S> {
    pub fn new(store: TodoStore<S>, on_save: FilterResetPolicy) -> Self {
        Self { store, filter: Filter::All, editing: None, on_save }
    }

    pub fn store(&self) -> &TodoStore<S> { &self.store }

    pub fn filter(&self) -> Filter { self.filter }

    /// Position of the record whose editor is open, if any.
    pub fn editing(&self) -> Option<usize> { self.editing }

    /// Records visible under the active filter, paired with their store position.
    pub fn visible(&self) -> Vec<(usize, TodoRecord)> {
        let records = self.store.records();
        visible_positions(&records, self.filter)
            .into_iter()
            .map(|i| (i, records[i].clone()))
            .collect()
    }

    pub async fn dispatch(&mut self, command: Command) -> StoreResult<Outcome> {
        tracing::debug!(?command, "dispatch");
        match command {
            Command::Add(text) => self.store.add(text).await.map(Outcome::Added),
            Command::Toggle(position) => {
                let completed = self.store.toggle(position).await?;
                Ok(Outcome::Toggled(position, completed))
            }
            Command::Edit(position) => {
                if let Some(open) = self.editing {
                    return Err(StoreError::ConcurrentEditConflict { open });
                }
                if self.store.get(position).is_none() {
                    return Err(StoreError::OutOfRange { position, len: self.store.count() });
                }
                self.editing = Some(position);
                Ok(Outcome::Editing(position))
            }
            Command::Save(position, text) => {
                self.store.update(position, text).await?;
                if self.editing == Some(position) {
                    self.editing = None;
                }
                if self.on_save == FilterResetPolicy::ResetToAll {
                    self.filter = Filter::All;
                }
                Ok(Outcome::Saved(position))
            }
            Command::CancelEdit => {
                self.editing = None;
                Ok(Outcome::EditCancelled)
            }
            Command::Delete(position) => {
                self.store.remove(position).await?;
                self.editing = match self.editing {
                    Some(open) if open == position => None,
                    Some(open) if open > position => Some(open - 1),
                    other => other,
                };
                Ok(Outcome::Deleted(position))
            }
            Command::SetFilter(filter) => {
                self.filter = filter;
                Ok(Outcome::FilterChanged(filter))
            }
        }
    }
}
