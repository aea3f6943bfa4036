//! FILENAME: grid-state/src/store.rs
//! PURPOSE: Persisted column layout (visibility, order, grouping).
//! CONTEXT: The host supplies the backing key-value store. Values are
//! stored as JSON under `{prefix}:{table}:{part}`. A value that is missing
//! or cannot be parsed is treated as absent so a corrupted entry never
//! blocks the table from rendering.

use std::collections::BTreeMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use grid_model::{DiagnosticKind, Diagnostics, GroupBy};
use crate::error::StateError;
use crate::snapshot::ColumnConfig;

const VISIBILITY: &str = "visibility";
const ORDER: &str = "order";
const GROUP_BY: &str = "group_by";

/// String key-value storage supplied by the host.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

/// In-process store, used when the host has no persistent storage.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

// ============================================================================
// LAYOUT STORE
// ============================================================================

/// Typed access to one table's persisted layout.
#[derive(Debug)]
pub struct LayoutStore<S> {
    store: S,
    prefix: String,
    table_id: String,
}

impl<S: KeyValueStore> LayoutStore<S> {
    pub fn new(store: S, prefix: impl Into<String>, table_id: impl Into<String>) -> Self {
        LayoutStore {
            store,
            prefix: prefix.into(),
            table_id: table_id.into(),
        }
    }

    pub fn key(&self, part: &str) -> String {
        format!("{}:{}:{}", self.prefix, self.table_id, part)
    }

    pub fn load_visibility(&self, diagnostics: &mut Diagnostics) -> Option<BTreeMap<String, bool>> {
        self.load(VISIBILITY, diagnostics)
    }

    pub fn load_order(&self, diagnostics: &mut Diagnostics) -> Option<Vec<String>> {
        self.load(ORDER, diagnostics)
    }

    pub fn load_group_by(&self, diagnostics: &mut Diagnostics) -> Option<Vec<GroupBy>> {
        self.load(GROUP_BY, diagnostics)
    }

    pub fn load_config(&self, diagnostics: &mut Diagnostics) -> ColumnConfig {
        ColumnConfig {
            column_order: self.load_order(diagnostics).unwrap_or_default(),
            visibility: self.load_visibility(diagnostics).unwrap_or_default(),
            group_by: self.load_group_by(diagnostics).unwrap_or_default(),
        }
    }

    pub fn save_visibility(&mut self, visibility: &BTreeMap<String, bool>) -> Result<(), StateError> {
        self.save(VISIBILITY, visibility)
    }

    pub fn save_order(&mut self, order: &[String]) -> Result<(), StateError> {
        self.save(ORDER, &order)
    }

    pub fn save_group_by(&mut self, group_by: &[GroupBy]) -> Result<(), StateError> {
        self.save(GROUP_BY, &group_by)
    }

    /// Writes every part; empty parts are removed instead of stored.
    pub fn save_config(&mut self, config: &ColumnConfig) -> Result<(), StateError> {
        if config.visibility.is_empty() {
            let key = self.key(VISIBILITY);
            self.store.remove(&key);
        } else {
            self.save_visibility(&config.visibility)?;
        }
        if config.column_order.is_empty() {
            let key = self.key(ORDER);
            self.store.remove(&key);
        } else {
            self.save_order(&config.column_order)?;
        }
        if config.group_by.is_empty() {
            let key = self.key(GROUP_BY);
            self.store.remove(&key);
        } else {
            self.save_group_by(&config.group_by)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        for part in [VISIBILITY, ORDER, GROUP_BY] {
            let key = self.key(part);
            self.store.remove(&key);
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn load<T: DeserializeOwned>(&self, part: &str, diagnostics: &mut Diagnostics) -> Option<T> {
        let key = self.key(part);
        let text = self.store.get(&key)?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                diagnostics.record(
                    &self.table_id,
                    DiagnosticKind::MalformedStoredValue,
                    key.clone(),
                    format!("ignoring malformed stored value '{}': {}", key, e),
                );
                None
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&mut self, part: &str, value: &T) -> Result<(), StateError> {
        let key = self.key(part);
        let text = serde_json::to_string(value)?;
        log::debug!(target: "STATE", "[{}] saving {}", self.table_id, key);
        self.store.set(&key, text);
        Ok(())
    }
}
