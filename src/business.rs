//! Business and symptom types
//!
//! Three stored entities:
//! - `Business`: identified by an externally supplied integer id
//! - `Symptom`: identified by its code (e.g. `SYMPT0001`)
//! - `BusinessSymptom`: the link between the two, keyed by (business id, symptom code)
//!
//! `BusinessSymptomRecord` is the read model returned by queries, with both
//! names joined in.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A business, keyed by the id it carries in the CSV feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    pub id: i64,
    pub name: String,
}

impl Business {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// A symptom, keyed by its code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symptom {
    pub code: String,
    pub name: String,
}

impl Symptom {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// A stored link between a business and a symptom.
///
/// `created_at` is written once on insert; `updated_at` moves on every upsert
/// of the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessSymptom {
    pub business_id: i64,
    pub symptom_code: String,
    pub diagnostic: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A link joined with the business and symptom names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessSymptomRecord {
    pub business_id: i64,
    pub business_name: String,
    pub symptom_code: String,
    pub symptom_name: String,
    pub diagnostic: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What an import does with the name of a business or symptom that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePolicy {
    /// Replace the stored name with the one from the latest CSV row
    #[default]
    Overwrite,
    /// Keep the name stored when the entity was first seen
    KeepExisting,
}

impl NamePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamePolicy::Overwrite => "overwrite",
            NamePolicy::KeepExisting => "keep_existing",
        }
    }
}

impl FromStr for NamePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Ok(NamePolicy::Overwrite),
            "keep_existing" | "keep-existing" | "keep" => Ok(NamePolicy::KeepExisting),
            _ => Err(Error::InvalidSetting(format!("unknown name policy: {}", s))),
        }
    }
}

impl std::fmt::Display for NamePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse a diagnostic flag as written in CSV files and query strings.
///
/// Accepts `true/false`, `1/0`, `yes/no`, `on/off`, `t/f` and `y/n`, case-insensitive.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
        _ => None,
    }
}
