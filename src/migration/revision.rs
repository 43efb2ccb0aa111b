//! Revisions and the chain they form.

use super::error::MigrationError;
use super::schema_manager::SchemaManager;
use crate::LifeError;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Longest revision id the version table can store.
pub const MAX_REVISION_ID_LEN: usize = 32;

/// One reversible schema change
///
/// Each revision names the revision it follows (`down_revision`); the first
/// revision follows nothing. Revisions run synchronously on the calling
/// thread, inside a transaction opened by the [`Migrator`](super::Migrator).
pub trait Revision: Send + Sync {
    /// Opaque revision id, e.g. `d2fd140158f0`
    fn id(&self) -> &str;

    /// The revision this one follows, `None` for the first revision
    fn down_revision(&self) -> Option<&str>;

    /// Human-readable summary shown by `history`
    fn description(&self) -> &str;

    /// Apply the change
    fn upgrade(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError>;

    /// Undo the change
    fn downgrade(&self, manager: &SchemaManager<'_>) -> Result<(), LifeError>;
}

/// Where a migration run should stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The newest revision
    Head,
    /// Nothing applied
    Base,
    /// A specific revision id
    Revision(String),
}

impl FromStr for Target {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(MigrationError::UnknownRevision(String::new())),
            "head" | "heads" => Ok(Target::Head),
            "base" => Ok(Target::Base),
            id => Ok(Target::Revision(id.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Head => f.write_str("head"),
            Target::Base => f.write_str("base"),
            Target::Revision(id) => f.write_str(id),
        }
    }
}

/// Validated, linear sequence of revisions ordered first to last
///
/// Built once; the checks (single root, no branches, no cycles, no dangling
/// or duplicate ids) never run again on the hot path.
pub struct RevisionChain {
    revisions: Vec<Box<dyn Revision>>,
}

impl RevisionChain {
    /// Validate `revisions` (in any order) and flatten them into chain order
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidChain` describing the first problem found.
    pub fn new(revisions: Vec<Box<dyn Revision>>) -> Result<Self, MigrationError> {
        let mut ids = HashSet::new();
        for revision in &revisions {
            validate_id(revision.id())?;
            if !ids.insert(revision.id()) {
                return Err(MigrationError::InvalidChain(format!(
                    "duplicate revision id {}",
                    revision.id()
                )));
            }
        }

        let mut root = None;
        let mut children: HashMap<&str, usize> = HashMap::new();
        for (index, revision) in revisions.iter().enumerate() {
            match revision.down_revision() {
                None => {
                    if let Some(existing) = root.replace(index) {
                        return Err(MigrationError::InvalidChain(format!(
                            "multiple root revisions: {} and {}",
                            revisions[existing].id(),
                            revision.id()
                        )));
                    }
                }
                Some(parent) => {
                    if !ids.contains(parent) {
                        return Err(MigrationError::InvalidChain(format!(
                            "revision {} follows unknown revision {parent}",
                            revision.id()
                        )));
                    }
                    if let Some(sibling) = children.insert(parent, index) {
                        return Err(MigrationError::InvalidChain(format!(
                            "revisions {} and {} both follow {parent}",
                            revisions[sibling].id(),
                            revision.id()
                        )));
                    }
                }
            }
        }

        let mut order = Vec::with_capacity(revisions.len());
        if let Some(root) = root {
            let mut next = Some(root);
            while let Some(index) = next {
                order.push(index);
                next = children.get(revisions[index].id()).copied();
            }
        }
        if order.len() != revisions.len() {
            return Err(MigrationError::InvalidChain(format!(
                "{} revision(s) are not reachable from the root (cycle?)",
                revisions.len() - order.len()
            )));
        }

        let mut slots: Vec<Option<Box<dyn Revision>>> = revisions.into_iter().map(Some).collect();
        let revisions = order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();
        Ok(Self { revisions })
    }

    /// Revisions in the order they are applied
    pub fn revisions(&self) -> &[Box<dyn Revision>] {
        &self.revisions
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Id of the last revision, `None` for an empty chain
    pub fn head(&self) -> Option<&str> {
        self.revisions.last().map(|r| r.id())
    }

    /// Index of `id` in chain order
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::UnknownRevision` if `id` is not part of the chain.
    pub fn position(&self, id: &str) -> Result<usize, MigrationError> {
        self.revisions
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| MigrationError::UnknownRevision(id.to_string()))
    }

    /// Number of revisions applied once the database is at `target`
    ///
    /// `Base` is 0, the head is `len()`, and revision `r` is `position(r) + 1`.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::UnknownRevision` for a revision target not in the chain.
    pub fn applied_count(&self, target: &Target) -> Result<usize, MigrationError> {
        match target {
            Target::Head => Ok(self.len()),
            Target::Base => Ok(0),
            Target::Revision(id) => Ok(self.position(id)? + 1),
        }
    }

    /// Same as [`applied_count`](Self::applied_count), for a stored version
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::UnknownRevision` if `version` is not part of the chain.
    pub fn applied_count_at(&self, version: Option<&str>) -> Result<usize, MigrationError> {
        match version {
            None => Ok(0),
            Some(id) => Ok(self.position(id)? + 1),
        }
    }
}

impl fmt::Debug for RevisionChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.revisions.iter().map(|r| r.id()))
            .finish()
    }
}

fn validate_id(id: &str) -> Result<(), MigrationError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_REVISION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(MigrationError::InvalidChain(format!(
            "invalid revision id {id:?}: expected 1-{MAX_REVISION_ID_LEN} chars of [0-9a-z_]"
        )))
    }
}
