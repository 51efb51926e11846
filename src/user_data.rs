use std::collections::BTreeMap;
use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A single value stored in an asset's user-data blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserDataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<bool> for UserDataValue {
    fn from(value: bool) -> Self {
        UserDataValue::Bool(value)
    }
}

impl From<i64> for UserDataValue {
    fn from(value: i64) -> Self {
        UserDataValue::Int(value)
    }
}

impl From<f64> for UserDataValue {
    fn from(value: f64) -> Self {
        UserDataValue::Float(value)
    }
}

impl From<&str> for UserDataValue {
    fn from(value: &str) -> Self {
        UserDataValue::String(value.to_string())
    }
}

impl From<String> for UserDataValue {
    fn from(value: String) -> Self {
        UserDataValue::String(value)
    }
}

/// Per-asset key/value configuration persisted as a JSON object.
///
/// Getters never fail: a missing key or a value of another kind yields the
/// caller's fallback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetUserData {
    data: BTreeMap<String, UserDataValue>,
    dirty: bool,
}

impl AssetUserData {
    /// Parse a user-data blob. Blank input yields an empty store.
    pub fn deserialize(blob: &str) -> Result<Self> {
        if blob.trim().is_empty() {
            return Ok(Self::default());
        }

        let data: BTreeMap<String, UserDataValue> =
            serde_json::from_str(blob).context("failed to parse asset user data JSON")?;
        Ok(Self { data, dirty: false })
    }

    /// Load the user-data blob stored at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to load asset user data: {}", path.display()))?;
        Self::deserialize(&content)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn get_bool(&self, key: &str, fallback: bool) -> bool {
        match self.data.get(key) {
            Some(UserDataValue::Bool(value)) => *value,
            _ => fallback,
        }
    }

    pub fn get_int(&self, key: &str, fallback: i64) -> i64 {
        match self.data.get(key) {
            Some(UserDataValue::Int(value)) => *value,
            _ => fallback,
        }
    }

    /// Integers are widened, since JSON does not keep `1` and `1.0` apart.
    pub fn get_float(&self, key: &str, fallback: f64) -> f64 {
        match self.data.get(key) {
            Some(UserDataValue::Float(value)) => *value,
            Some(UserDataValue::Int(value)) => *value as f64,
            _ => fallback,
        }
    }

    pub fn get_string(&self, key: &str, fallback: &str) -> String {
        match self.data.get(key) {
            Some(UserDataValue::String(value)) => value.clone(),
            _ => fallback.to_string(),
        }
    }

    /// Store `value` under `key`. Only an actual change marks the store dirty.
    pub fn set_value(&mut self, key: &str, value: impl Into<UserDataValue>) {
        let value = value.into();
        if self.data.get(key) == Some(&value) {
            return;
        }
        self.data.insert(key.to_string(), value);
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Serialize to a JSON blob and clear the dirty flag.
    pub fn serialize(&mut self) -> Result<String> {
        let blob =
            serde_json::to_string(&self.data).context("failed to serialize asset user data")?;
        self.dirty = false;
        Ok(blob)
    }

    /// Write the blob to `path` if anything changed since the last save.
    ///
    /// # Returns
    ///
    /// `true` when the file was written.
    pub fn apply_modified(&mut self, path: &Path) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }

        let blob = self.serialize()?;
        fs::write(path, blob)
            .with_context(|| format!("failed to save asset user data: {}", path.display()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_blank_blob_when_deserializing_then_store_is_empty() {
        let store = AssetUserData::deserialize("  \n").expect("blank blob is valid");

        assert!(!store.contains_key("applyAxisConversion"));
        assert!(!store.is_dirty());
    }

    #[test]
    fn given_mixed_blob_when_reading_then_values_match_their_kinds() {
        let store = AssetUserData::deserialize(
            r#"{"flag":true,"count":3,"ratio":0.5,"label":"body"}"#,
        )
        .expect("valid blob");

        assert!(store.get_bool("flag", false));
        assert_eq!(store.get_int("count", 0), 3);
        assert_eq!(store.get_float("ratio", 0.0), 0.5);
        assert_eq!(store.get_float("count", 0.0), 3.0);
        assert_eq!(store.get_string("label", ""), "body");
    }

    #[test]
    fn given_missing_or_mistyped_key_when_reading_then_fallback_is_returned() {
        let store = AssetUserData::deserialize(r#"{"flag":"yes"}"#).expect("valid blob");

        assert!(store.get_bool("flag", true));
        assert!(!store.get_bool("absent", false));
        assert_eq!(store.get_int("flag", 7), 7);
    }

    #[test]
    fn given_same_value_when_setting_then_store_stays_clean() {
        let mut store = AssetUserData::deserialize(r#"{"flipZAxis":true}"#).expect("valid blob");

        store.set_value("flipZAxis", true);
        assert!(!store.is_dirty());

        store.set_value("flipZAxis", false);
        assert!(store.is_dirty());
    }

    #[test]
    fn given_dirty_store_when_serializing_then_flag_clears_and_blob_round_trips() {
        let mut store = AssetUserData::default();
        store.set_value("applyAxisConversion", true);
        store.set_value("note", "hello");

        let blob = store.serialize().expect("serialize");
        assert!(!store.is_dirty());

        let reloaded = AssetUserData::deserialize(&blob).expect("reload");
        assert!(reloaded.get_bool("applyAxisConversion", false));
        assert_eq!(reloaded.get_string("note", ""), "hello");
    }

    #[test]
    fn given_clean_store_when_applying_then_nothing_is_written() {
        let path = std::env::temp_dir().join(format!(
            "axisfix-user-data-clean-{}.json",
            std::process::id()
        ));
        let mut store = AssetUserData::default();

        assert!(!store.apply_modified(&path).expect("apply"));
        assert!(!path.exists());
    }

    #[test]
    fn given_dirty_store_when_applying_then_blob_is_written_once() {
        let path = std::env::temp_dir().join(format!(
            "axisfix-user-data-dirty-{}.json",
            std::process::id()
        ));
        let mut store = AssetUserData::default();
        store.set_value("flipZAxis", false);

        assert!(store.apply_modified(&path).expect("first apply"));
        assert!(!store.apply_modified(&path).expect("second apply"));

        let loaded = AssetUserData::load(&path).expect("load");
        assert!(!loaded.get_bool("flipZAxis", true));
        let _ = fs::remove_file(&path);
    }
}
