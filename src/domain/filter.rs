use super::todo::TodoRecord;

/// Visibility filter over completion state. Never mutates anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Completed,
    NotCompleted,
}

impl Filter {
    pub fn matches(self, record: &TodoRecord) -> bool {
        match self {
            Filter::All => true,
            Filter::Completed => record.completed,
            Filter::NotCompleted => !record.completed,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Filter::All => Filter::NotCompleted,
            Filter::NotCompleted => Filter::Completed,
            Filter::Completed => Filter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Completed => "Completed",
            Filter::NotCompleted => "Not Completed",
        }
    }
}

/// Positions of the records visible under `filter`, in store order.
pub fn visible_positions(records: &[TodoRecord], filter: Filter) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| filter.matches(r))
        .map(|(i, _)| i)
        .collect()
}
