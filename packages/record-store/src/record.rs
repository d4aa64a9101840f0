use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::StoreError;
use crate::value::FieldValue;

pub type RecordId = u64;

/// Ordered attribute set of a record, excluding its id.
pub type Fields = IndexMap<String, FieldValue>;

/// Reserved attribute name. Never stored inside `Fields`.
pub const ID_FIELD: &str = "id";

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub fields: Fields,
}

impl Record {
    pub(crate) fn new(id: RecordId, mut fields: Fields) -> Self {
        fields.shift_remove(ID_FIELD);
        Self { id, fields }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn to_json(&self) -> Value {
        let mut obj: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect();
        obj.insert(ID_FIELD.to_string(), Value::from(self.id));
        Value::Object(obj)
    }
}

// Attributes first, then `id`, matching what clients of the SMS API expect.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(ID_FIELD, &self.id)?;
        map.end()
    }
}

/// Turns a decoded request body into a field set.
///
/// Anything other than a JSON object is rejected. A caller-supplied `id` is
/// dropped here since the store owns identifier assignment.
pub fn fields_from_json(payload: Value) -> Result<Fields, StoreError> {
    match payload {
        Value::Object(obj) => Ok(obj
            .into_iter()
            .filter(|(k, _)| k != ID_FIELD)
            .map(|(k, v)| (k, FieldValue::from(v)))
            .collect()),
        other => Err(StoreError::InvalidPayload(json_kind(&other))),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
