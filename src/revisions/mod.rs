//! The task service's revision chain.

mod add_task_indexes;
mod init;

pub use add_task_indexes::AddTaskIndexes;
pub use init::Init;

use crate::migration::{MigrationError, Revision, RevisionChain};

/// Every revision the service ships, validated into one chain
///
/// # Errors
///
/// Returns `MigrationError::InvalidChain` if the revisions do not link up.
pub fn task_revisions() -> Result<RevisionChain, MigrationError> {
    RevisionChain::new(all())
}

/// The revisions in chain order, unvalidated
pub fn all() -> Vec<Box<dyn Revision>> {
    vec![Box::new(Init), Box::new(AddTaskIndexes)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_order_and_head() {
        let chain = task_revisions().unwrap();
        let ids: Vec<&str> = chain.revisions().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["d2fd140158f0", "3aa1b4305414"]);
        assert_eq!(chain.head(), Some("3aa1b4305414"));
    }
}
