//! Task records, request bodies and list filters.

use crate::LifeError;
use may_postgres::Row;
use serde::{Deserialize, Serialize};

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;
pub const TAG_MAX_CHARS: usize = 50;

pub const DEFAULT_LIST_LIMIT: u64 = 100;
pub const MAX_LIST_LIMIT: u64 = 500;
pub const MAX_LIST_OFFSET: u64 = i64::MAX as u64;

/// A stored task, also the response body for every task endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub tag: Option<String>,
    pub completed: bool,
}

impl Task {
    /// Build a task from a `SELECT`/`RETURNING` row over the `task` columns
    pub fn from_row(row: &Row) -> Result<Self, LifeError> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            tag: row.try_get("tag")?,
            completed: row.try_get("completed")?,
        })
    }
}

/// Create/replace request body
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskIn {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: must be at least {min} character(s)")]
    TooShort { field: &'static str, min: usize },
    #[error("{field}: must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl TaskIn {
    /// Check field lengths, counted in characters
    pub fn validate(&self) -> Result<(), ValidationError> {
        let title = self.title.chars().count();
        if title < 1 {
            return Err(ValidationError::TooShort {
                field: "title",
                min: 1,
            });
        }
        check_max("title", Some(&self.title), TITLE_MAX_CHARS)?;
        check_max(
            "description",
            self.description.as_deref(),
            DESCRIPTION_MAX_CHARS,
        )?;
        check_max("tag", self.tag.as_deref(), TAG_MAX_CHARS)?;
        Ok(())
    }
}

fn check_max(field: &'static str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        _ => Ok(()),
    }
}

/// `GET /tasks/` query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    pub tag: Option<String>,
    pub completed: Option<bool>,
    pub limit: u64,
    pub offset: u64,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            search: None,
            tag: None,
            completed: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl TaskFilter {
    /// Parse a raw query string (without the leading `?`)
    ///
    /// Unknown parameters are ignored; repeated ones keep the last value.
    pub fn from_query(query: &str) -> Result<Self, ValidationError> {
        let mut filter = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "search" => filter.search = Some(value.into_owned()),
                "tag" => filter.tag = Some(value.into_owned()),
                "completed" => filter.completed = Some(parse_bool("completed", &value)?),
                "limit" => {
                    let limit = parse_u64("limit", &value)?;
                    if !(1..=MAX_LIST_LIMIT).contains(&limit) {
                        return Err(ValidationError::Invalid {
                            field: "limit",
                            message: format!("must be between 1 and {MAX_LIST_LIMIT}"),
                        });
                    }
                    filter.limit = limit;
                }
                "offset" => {
                    let offset = parse_u64("offset", &value)?;
                    // Bound to what PostgreSQL's bigint OFFSET can take.
                    if offset > MAX_LIST_OFFSET {
                        return Err(ValidationError::Invalid {
                            field: "offset",
                            message: format!("must be at most {MAX_LIST_OFFSET}"),
                        });
                    }
                    filter.offset = offset;
                }
                _ => {}
            }
        }
        Ok(filter)
    }

    /// The search term, if it is non-empty
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ValidationError::Invalid {
            field,
            message: format!("{value:?} is not a valid boolean"),
        }),
    }
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, ValidationError> {
    value.parse().map_err(|_| ValidationError::Invalid {
        field,
        message: format!("{value:?} is not a valid non-negative integer"),
    })
}

/// Escape `%`, `_` and `\` so `term` matches literally inside a `LIKE` pattern
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
