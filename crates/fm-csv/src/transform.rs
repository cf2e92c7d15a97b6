//! Pure, per-field dataset transforms and filters
//!
//! Nothing here touches the filesystem or mutates its input; every operation
//! returns a new [`Dataset`].

use fm_core::{CoerceType, Dataset, Record, TransformDef, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One-argument value transform
pub type TransformFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// How a single field is rewritten
#[derive(Clone)]
pub enum TransformRule {
    /// Replace values found in the table. Lookup uses the value's text form,
    /// so `Int(1)` and `Text("1")` hit the same entry. Values with no entry
    /// pass through unchanged unless `unmapped` is set.
    Mapping {
        values: BTreeMap<String, Value>,
        unmapped: Option<Value>,
    },
    /// Convert to another scalar type; values that cannot be converted
    /// become `Null`
    Coerce(CoerceType),
    /// Arbitrary function
    Function(TransformFn),
}

impl fmt::Debug for TransformRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformRule::Mapping { values, unmapped } => f
                .debug_struct("Mapping")
                .field("values", values)
                .field("unmapped", unmapped)
                .finish(),
            TransformRule::Coerce(to) => f.debug_tuple("Coerce").field(to).finish(),
            TransformRule::Function(_) => f.write_str("Function(..)"),
        }
    }
}

fn map_text(value: &Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::Text(s) => Value::Text(f(s)),
        other => other.clone(),
    }
}

impl TransformRule {
    /// Mapping rule with pass-through for unmapped values
    pub fn mapping<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        TransformRule::Mapping {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            unmapped: None,
        }
    }

    /// Replace values that have no mapping entry with `fallback`.
    /// No effect on non-mapping rules.
    pub fn or_unmapped(self, fallback: impl Into<Value>) -> Self {
        match self {
            TransformRule::Mapping { values, .. } => TransformRule::Mapping {
                values,
                unmapped: Some(fallback.into()),
            },
            other => other,
        }
    }

    pub fn coerce(to: CoerceType) -> Self {
        TransformRule::Coerce(to)
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        TransformRule::Function(Arc::new(f))
    }

    pub fn lowercase() -> Self {
        Self::function(|v| map_text(v, str::to_lowercase))
    }

    pub fn uppercase() -> Self {
        Self::function(|v| map_text(v, str::to_uppercase))
    }

    pub fn trim() -> Self {
        Self::function(|v| map_text(v, |s| s.trim().to_string()))
    }

    /// Apply the rule to one value
    pub fn apply(&self, value: &Value) -> Value {
        match self {
            TransformRule::Mapping { values, unmapped } => {
                match values.get(value.to_string().as_str()) {
                    Some(mapped) => mapped.clone(),
                    None => unmapped.clone().unwrap_or_else(|| value.clone()),
                }
            }
            TransformRule::Coerce(to) => coerce(value, *to),
            TransformRule::Function(f) => f(value),
        }
    }
}

fn coerce(value: &Value, to: CoerceType) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    let converted = match to {
        CoerceType::Integer => value.to_integer().map(Value::Int),
        CoerceType::Float => value.to_float().map(Value::Float),
        CoerceType::Boolean => value.to_bool().map(Value::Bool),
        CoerceType::String => Some(Value::Text(value.to_string())),
    };
    converted.unwrap_or_else(|| {
        log::debug!("Could not coerce {:?} to {:?}", value, to);
        Value::Null
    })
}

impl From<&TransformDef> for TransformRule {
    fn from(def: &TransformDef) -> Self {
        match def {
            TransformDef::Mapping { values, unmapped } => TransformRule::Mapping {
                values: values.clone(),
                unmapped: unmapped.clone(),
            },
            TransformDef::Coerce { to } => TransformRule::Coerce(*to),
            TransformDef::Lowercase => TransformRule::lowercase(),
            TransformDef::Uppercase => TransformRule::uppercase(),
            TransformDef::Trim => TransformRule::trim(),
        }
    }
}

/// Field name to rule
#[derive(Debug, Clone, Default)]
pub struct TransformRules {
    rules: BTreeMap<String, TransformRule>,
}

impl TransformRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, rule: TransformRule) -> Self {
        self.rules.insert(field.into(), rule);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, rule: TransformRule) {
        self.rules.insert(field.into(), rule);
    }

    /// Build rules from the declarative definitions in fieldmove.yml
    pub fn from_defs(defs: &BTreeMap<String, TransformDef>) -> Self {
        Self {
            rules: defs
                .iter()
                .map(|(field, def)| (field.clone(), TransformRule::from(def)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rewrite one record. Fields absent from the record are not created.
    pub fn apply_record(&self, record: &Record) -> Record {
        record
            .iter()
            .map(|(field, value)| {
                let value = match self.rules.get(field) {
                    Some(rule) => rule.apply(value),
                    None => value.clone(),
                };
                (field.clone(), value)
            })
            .collect()
    }
}

/// Return a new dataset with every configured field rewritten
pub fn transform_data(data: &Dataset, rules: &TransformRules) -> Dataset {
    Dataset::new(
        data.columns.clone(),
        data.records.iter().map(|r| rules.apply_record(r)).collect(),
    )
}

/// Return a new dataset holding only the records matching `predicate`
pub fn filter_data<F>(data: &Dataset, predicate: F) -> Dataset
where
    F: Fn(&Record) -> bool,
{
    Dataset::new(
        data.columns.clone(),
        data.records
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect(),
    )
}

#[cfg(test)]
#[path = "transform_test.rs"]
mod tests;
