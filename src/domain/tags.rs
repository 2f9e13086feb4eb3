//! Resource tags.
//!
//! The provider returns tags as an ordered list of key/value pairs and does not
//! guarantee unique keys. `TagMap` collapses that list into a mapping where the
//! last occurrence of a key wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Display label copied from a volume onto its snapshots.
pub const NAME_TAG: &str = "Name";

/// Opt-in marker for tagged-only backups (`Backup=true`).
pub const BACKUP_TAG: &str = "Backup";

/// Provenance key written on every snapshot this tool creates.
pub const CREATED_BY_TAG: &str = "CreatedBy";

/// Provenance value paired with [`CREATED_BY_TAG`].
pub const AUTOMATED_BACKUP: &str = "AutomatedBackup";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMap(BTreeMap<String, String>);

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from provider order. Later duplicates overwrite earlier ones.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut tags = Self::new();
        for (key, value) in pairs {
            tags.insert(key, value);
        }
        tags
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// True when `key` is present with exactly `value`.
    pub fn has(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    /// The `Name` tag, empty when absent.
    pub fn name(&self) -> &str {
        self.get(NAME_TAG).unwrap_or("")
    }

    /// Whether the volume opted in with `Backup=true`.
    pub fn backup_requested(&self) -> bool {
        self.has(BACKUP_TAG, "true")
    }

    pub fn is_automated(&self) -> bool {
        self.has(CREATED_BY_TAG, AUTOMATED_BACKUP)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}
