use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::level::{ImportanceLevel, UrgencyLevel, deserialize_lenient};

/// A tenant's customer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Client {
    pub id: String,
    pub name: String,
}

/// A body of work for one client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: String,
    pub client_id: Option<String>,
    pub name: String,
}

/// A group of pitches, either inside a project or directly under a client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Set {
    pub id: String,
    pub client_id: Option<String>,
    pub project_id: Option<String>,
    pub name: String,
    #[serde(deserialize_with = "deserialize_lenient")]
    pub urgency: UrgencyLevel,
    #[serde(deserialize_with = "deserialize_lenient")]
    pub importance: ImportanceLevel,
    pub priority: Option<u8>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A proposal inside a set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pitch {
    pub id: String,
    pub set_id: Option<String>,
    pub name: String,
    #[serde(deserialize_with = "deserialize_lenient")]
    pub urgency: UrgencyLevel,
    #[serde(deserialize_with = "deserialize_lenient")]
    pub importance: ImportanceLevel,
    pub priority: Option<u8>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A scheduled stage of a project.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Phase {
    pub id: String,
    pub project_id: Option<String>,
    pub name: String,
    #[serde(deserialize_with = "deserialize_lenient")]
    pub urgency: UrgencyLevel,
    #[serde(deserialize_with = "deserialize_lenient")]
    pub importance: ImportanceLevel,
    pub priority: Option<u8>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A client requirement, scoped anywhere along Client → Project → Set → Pitch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirement {
    pub id: String,
    pub client_id: Option<String>,
    pub project_id: Option<String>,
    pub set_id: Option<String>,
    pub pitch_id: Option<String>,
    pub title: String,
    #[serde(deserialize_with = "deserialize_lenient")]
    pub urgency: UrgencyLevel,
    #[serde(deserialize_with = "deserialize_lenient")]
    pub importance: ImportanceLevel,
    pub priority: Option<u8>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Entity lists as fetched by the data layer.
///
/// A `None` list has not been loaded yet and is treated as empty everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients: Option<Vec<Client>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<Vec<Set>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitches: Option<Vec<Pitch>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phases: Option<Vec<Phase>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<Requirement>>,
}

impl Dataset {
    /// Parse a dataset from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error when the text is not a JSON object of entity arrays.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse dataset JSON")
    }

    /// Read and parse a dataset file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}
