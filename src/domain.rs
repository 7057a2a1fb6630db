use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::GlossaryError;

/// Label of the "every work" option in the work selector.
pub const ALL_WORKS_LABEL: &str = "All Novels";

pub type EntryId = u64;

/// One glossary record. `id` is the position in the load that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub chinese: String,
    pub english: String,
    pub novel: String,
}

impl Entry {
    pub fn new(id: EntryId, record: EntryRecord) -> Self {
        Self {
            id,
            chinese: record.chinese,
            english: record.english,
            novel: record.novel,
        }
    }

    pub fn to_record(&self) -> EntryRecord {
        EntryRecord {
            chinese: self.chinese.clone(),
            english: self.english.clone(),
            novel: self.novel.clone(),
        }
    }
}

/// Id-less form used on the wire and in the updated-glossary export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    #[serde(default)]
    pub chinese: String,
    #[serde(default)]
    pub english: String,
    #[serde(default)]
    pub novel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum WorkFilter {
    #[default]
    All,
    Work(String),
}

impl WorkFilter {
    pub fn label(&self) -> &str {
        match self {
            WorkFilter::All => ALL_WORKS_LABEL,
            WorkFilter::Work(name) => name,
        }
    }

    pub fn matches(&self, novel: &str) -> bool {
        match self {
            WorkFilter::All => true,
            WorkFilter::Work(name) => name == novel,
        }
    }
}

impl fmt::Display for WorkFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for WorkFilter {
    type Err = GlossaryError;

    /// Only the empty string and the exact "All Novels" label select every
    /// work; anything else names a work verbatim.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() || value == ALL_WORKS_LABEL {
            return Ok(WorkFilter::All);
        }
        Ok(WorkFilter::Work(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        matches!(self, Theme::Dark)
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

pub fn parse_entry_id(value: &str) -> Result<EntryId, GlossaryError> {
    value
        .trim()
        .parse::<EntryId>()
        .map_err(|_| GlossaryError::InvalidEntryId(value.to_string()))
}
