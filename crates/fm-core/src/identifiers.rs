//! Strongly-typed identifiers for tables and migration runs.

use crate::newtype_string::define_identifier;
use chrono::Utc;
use uuid::Uuid;

define_identifier! {
    /// Name of a table handled by a migration (possibly schema-qualified, e.g. "raw.users").
    pub struct TableName;
}

define_identifier! {
    /// Unique identifier of one migration run.
    pub struct MigrationId;
}

impl MigrationId {
    /// Allocate a fresh identifier: UTC timestamp plus a random suffix.
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "mig-{}-{}",
            Utc::now().format("%Y%m%d%H%M%S"),
            &suffix[..8]
        ))
    }
}
