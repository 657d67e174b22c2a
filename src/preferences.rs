//! Persisted state (§6.5): an opaque "user preferences" blob — a
//! language tag plus a serialized parameter snapshot. The core never
//! touches a file itself; `to_json`/`from_json` are in-memory only, and
//! a thin external shim is responsible for reading/writing the bytes.

use crate::params::{ParameterStore, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value")]
enum WireValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Choice(String),
}

impl From<&Value> for WireValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Bool(b) => WireValue::Bool(*b),
            Value::Int(i) => WireValue::Int(*i),
            Value::Float(f) => WireValue::Float(*f),
            Value::Choice(s) => WireValue::Choice(s.clone()),
        }
    }
}

impl From<WireValue> for Value {
    fn from(v: WireValue) -> Self {
        match v {
            WireValue::Bool(b) => Value::Bool(b),
            WireValue::Int(i) => Value::Int(i),
            WireValue::Float(f) => Value::Float(f),
            WireValue::Choice(s) => Value::Choice(s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserPreferences {
    pub language: Option<String>,
    parameters: BTreeMap<String, WireValue>,
}

impl UserPreferences {
    pub fn from_store(language: Option<String>, store: &ParameterStore) -> Self {
        let parameters = store
            .iter()
            .map(|(k, v)| (k.to_string(), WireValue::from(v)))
            .collect();
        UserPreferences {
            language,
            parameters,
        }
    }

    /// Apply the saved snapshot onto a fresh default store, skipping any
    /// key the current schema no longer declares.
    pub fn apply_to(&self, store: &mut ParameterStore) {
        let overrides: Vec<(&str, Value)> = self
            .parameters
            .iter()
            .map(|(k, v)| (k.as_str(), Value::from(v.clone())))
            .collect();
        store.apply_overrides(&overrides);
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let mut store = ParameterStore::with_defaults();
        store.set("udcp_omega", Value::Float(0.8)).unwrap();
        let prefs = UserPreferences::from_store(Some("en".to_string()), &store);
        let json = prefs.to_json().unwrap();
        let back = UserPreferences::from_json(&json).unwrap();
        assert_eq!(prefs, back);
    }

    #[test]
    fn applies_saved_overrides_onto_defaults() {
        let mut store = ParameterStore::with_defaults();
        store.set("udcp_omega", Value::Float(0.7)).unwrap();
        let prefs = UserPreferences::from_store(None, &store);

        let mut fresh = ParameterStore::with_defaults();
        prefs.apply_to(&mut fresh);
        assert_eq!(fresh.get_f32("udcp_omega").unwrap(), 0.7);
    }

    #[test]
    fn stale_key_in_json_is_ignored() {
        let json = r#"{"language":null,"parameters":{"not_a_real_key":{"kind":"Bool","value":true}}}"#;
        let prefs = UserPreferences::from_json(json).unwrap();
        let mut store = ParameterStore::with_defaults();
        prefs.apply_to(&mut store);
    }
}
