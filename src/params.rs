//! The parameter store: the single source of truth for stage parameters.
//!
//! Writes are validated and clamped against the C8 schema; reads of an
//! undeclared key fail. The store itself has no notion of "current
//! image" or "current stage" — it is pure key/value state, mutated only
//! through [`ParameterStore::set`].

use crate::error::{Error, ValueKind};
use crate::schema::{self, ParamKind};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    Choice(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Choice(_) => ValueKind::Choice,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f32),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i32),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&str> {
        match self {
            Value::Choice(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// An ordered (by key) mapping from schema-declared parameter name to value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStore {
    values: BTreeMap<String, Value>,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ParameterStore {
    /// Build a store populated with every schema default.
    pub fn with_defaults() -> Self {
        let mut values = BTreeMap::new();
        for d in schema::schema() {
            values.insert(d.key.to_string(), (d.default)());
        }
        ParameterStore { values }
    }

    pub fn get(&self, key: &str) -> Result<&Value, Error> {
        self.values
            .get(key)
            .ok_or_else(|| Error::UnknownParameter(key.to_string()))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, Error> {
        self.get(key)?
            .as_bool()
            .ok_or_else(|| Error::TypeMismatch {
                key: key.to_string(),
                expected: ValueKind::Bool,
                actual: self.values[key].kind(),
            })
    }

    pub fn get_f32(&self, key: &str) -> Result<f32, Error> {
        self.get(key)?
            .as_f32()
            .ok_or_else(|| Error::TypeMismatch {
                key: key.to_string(),
                expected: ValueKind::Float,
                actual: self.values[key].kind(),
            })
    }

    pub fn get_i32(&self, key: &str) -> Result<i32, Error> {
        self.get(key)?
            .as_i32()
            .ok_or_else(|| Error::TypeMismatch {
                key: key.to_string(),
                expected: ValueKind::Int,
                actual: self.values[key].kind(),
            })
    }

    pub fn get_choice(&self, key: &str) -> Result<String, Error> {
        self.get(key)?
            .as_choice()
            .map(|s| s.to_string())
            .ok_or_else(|| Error::TypeMismatch {
                key: key.to_string(),
                expected: ValueKind::Choice,
                actual: self.values[key].kind(),
            })
    }

    /// Validate, clamp, and apply a write. Returns `Err` for
    /// `UnknownParameter`/`TypeMismatch` (store left unchanged) or for
    /// `OutOfRange` (the clamped value is still written; the error is a
    /// non-fatal report, per the error taxonomy).
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), Error> {
        let descriptor = schema::descriptor(key)
            .ok_or_else(|| Error::UnknownParameter(key.to_string()))?;

        let expected = match descriptor.kind {
            ParamKind::Bool => ValueKind::Bool,
            ParamKind::Int => ValueKind::Int,
            ParamKind::Float => ValueKind::Float,
            ParamKind::Choice => ValueKind::Choice,
        };
        if value.kind() != expected {
            return Err(Error::TypeMismatch {
                key: key.to_string(),
                expected,
                actual: value.kind(),
            });
        }

        match (&descriptor.kind, value) {
            (ParamKind::Bool, v @ Value::Bool(_)) => {
                self.values.insert(key.to_string(), v);
                Ok(())
            }
            (ParamKind::Choice, Value::Choice(s)) => {
                if !descriptor.choices.contains(&s.as_str()) {
                    return Err(Error::TypeMismatch {
                        key: key.to_string(),
                        expected: ValueKind::Choice,
                        actual: ValueKind::Choice,
                    });
                }
                self.values.insert(key.to_string(), Value::Choice(s));
                Ok(())
            }
            (ParamKind::Int, Value::Int(i)) => {
                let clamped = (i as f64).clamp(descriptor.min, descriptor.max) as i32;
                self.values.insert(key.to_string(), Value::Int(clamped));
                if clamped != i {
                    return Err(Error::OutOfRange {
                        key: key.to_string(),
                        value: i as f64,
                        min: descriptor.min,
                        max: descriptor.max,
                    });
                }
                Ok(())
            }
            (ParamKind::Float, Value::Float(f)) => {
                let clamped = (f as f64).clamp(descriptor.min, descriptor.max) as f32;
                self.values.insert(key.to_string(), Value::Float(clamped));
                if (clamped - f).abs() > f32::EPSILON {
                    return Err(Error::OutOfRange {
                        key: key.to_string(),
                        value: f as f64,
                        min: descriptor.min,
                        max: descriptor.max,
                    });
                }
                Ok(())
            }
            _ => unreachable!("kind already matched above"),
        }
    }

    /// Reset every parameter the schema declares to its default value.
    pub fn reset_to_defaults(&mut self) {
        *self = Self::with_defaults();
    }

    /// Reset only the parameters belonging to one stage.
    pub fn reset_stage_defaults(&mut self, stage: crate::schema::StageId) {
        for key in stage.parameter_keys() {
            if let Some(descriptor) = schema::descriptor(key) {
                self.values.insert(key.to_string(), (descriptor.default)());
            }
        }
    }

    /// Apply a partial override map, clamping each value via [`Self::set`]
    /// but never failing the whole batch: unknown keys or type mismatches
    /// in one override are skipped rather than aborting the others,
    /// matching the auto-tune contract (AutoTuneFailed is per-stage, not
    /// per-key).
    pub fn apply_overrides(&mut self, overrides: &[(&str, Value)]) {
        for (key, value) in overrides {
            let _ = self.set(key, value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StageId;

    #[test]
    fn unknown_write_is_rejected() {
        let mut store = ParameterStore::with_defaults();
        let err = store.set("not_a_real_key", Value::Bool(true)).unwrap_err();
        assert!(matches!(err, Error::UnknownParameter(_)));
    }

    #[test]
    fn unknown_read_fails() {
        let store = ParameterStore::with_defaults();
        assert!(matches!(
            store.get("not_a_real_key"),
            Err(Error::UnknownParameter(_))
        ));
    }

    #[test]
    fn out_of_range_write_is_clamped_not_dropped() {
        let mut store = ParameterStore::with_defaults();
        let err = store
            .set("udcp_omega", Value::Float(5.0))
            .unwrap_err();
        assert!(matches!(err, Error::OutOfRange { .. }));
        assert_eq!(store.get_f32("udcp_omega").unwrap(), 1.0);
    }

    #[test]
    fn last_write_wins() {
        let mut store = ParameterStore::with_defaults();
        store.set("udcp_omega", Value::Float(0.5)).unwrap();
        store.set("udcp_omega", Value::Float(0.6)).unwrap();
        assert_eq!(store.get_f32("udcp_omega").unwrap(), 0.6);
    }

    #[test]
    fn reset_to_defaults_is_idempotent() {
        let mut store = ParameterStore::with_defaults();
        store.set("udcp_omega", Value::Float(0.42)).unwrap();
        store.reset_to_defaults();
        let first = store.clone();
        store.reset_to_defaults();
        assert_eq!(first, store);
    }

    #[test]
    fn reset_stage_defaults_only_touches_that_stage() {
        let mut store = ParameterStore::with_defaults();
        store.set("udcp_omega", Value::Float(0.42)).unwrap();
        store
            .set("beer_lambert_depth_factor", Value::Float(1.0))
            .unwrap();
        store.reset_stage_defaults(StageId::Udcp);
        assert_eq!(store.get_f32("udcp_omega").unwrap(), 0.95);
        assert_eq!(store.get_f32("beer_lambert_depth_factor").unwrap(), 1.0);
    }
}
