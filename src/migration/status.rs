//! Migration status reporting

/// Where the database stands relative to the revision chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Applied version, `None` when nothing has been applied
    pub current: Option<String>,

    /// Newest revision in the chain
    pub head: Option<String>,

    /// Revisions after `current`, in the order they would be applied
    pub pending: Vec<String>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
