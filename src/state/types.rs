use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Durable registration of one service stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: i64,
    pub name: String,
    /// Directory holding the service's definition file.
    pub path: PathBuf,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when registering a service; the store assigns the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServiceRecord {
    pub name: String,
    pub path: PathBuf,
    pub enabled: bool,
}

/// Result of attempting to insert a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(ServiceRecord),
    /// A record with that name exists; it was left untouched.
    AlreadyExists,
}
