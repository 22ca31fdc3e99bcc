//! Typed access to tool arguments and omission-aware request bodies.

use serde_json::{Map, Value};

use crate::error::ToolError;

/// Arguments of one tool invocation.
///
/// JSON `null` counts as absent everywhere, matching how optional fields are
/// dropped from outbound payloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Map<String, Value>);

impl Args {
    /// Accept an object, or `null`/missing for tools without parameters
    pub fn from_value(value: Value) -> Result<Self, ToolError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            _ => Err(ToolError::invalid("arguments", "an object")),
        }
    }

    fn present(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    fn require<'a>(&'a self, name: &str) -> Result<&'a Value, ToolError> {
        self.present(name)
            .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }

    pub fn required_str(&self, name: &str) -> Result<String, ToolError> {
        self.require(name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ToolError::invalid(name, "a string"))
    }

    pub fn optional_str(&self, name: &str) -> Result<Option<String>, ToolError> {
        match self.present(name) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| ToolError::invalid(name, "a string")),
        }
    }

    pub fn required_bool(&self, name: &str) -> Result<bool, ToolError> {
        self.require(name)?
            .as_bool()
            .ok_or_else(|| ToolError::invalid(name, "a boolean"))
    }

    pub fn optional_bool(&self, name: &str) -> Result<Option<bool>, ToolError> {
        match self.present(name) {
            None => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| ToolError::invalid(name, "a boolean")),
        }
    }

    /// An integer, also accepting a string of digits (`"42"`)
    pub fn optional_int(&self, name: &str) -> Result<Option<i64>, ToolError> {
        match self.present(name) {
            None => Ok(None),
            Some(v) => int_like(v)
                .map(Some)
                .ok_or_else(|| ToolError::invalid(name, "an integer")),
        }
    }

    pub fn required_int(&self, name: &str) -> Result<i64, ToolError> {
        int_like(self.require(name)?).ok_or_else(|| ToolError::invalid(name, "an integer"))
    }

    /// A string, also accepting a number which is converted to its decimal text
    pub fn required_text(&self, name: &str) -> Result<String, ToolError> {
        match self.require(name)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(ToolError::invalid(name, "a string or number")),
        }
    }

    /// Path identifier; blank counts as missing
    pub fn required_id(&self, name: &str) -> Result<String, ToolError> {
        let id = self.required_text(name)?;
        if id.trim().is_empty() {
            return Err(ToolError::MissingArgument(name.to_string()));
        }
        Ok(id)
    }

    pub fn required_array(&self, name: &str) -> Result<Value, ToolError> {
        let value = self.require(name)?;
        if value.is_array() {
            Ok(value.clone())
        } else {
            Err(ToolError::invalid(name, "an array"))
        }
    }

    pub fn optional_array(&self, name: &str) -> Result<Option<Value>, ToolError> {
        match self.present(name) {
            None => Ok(None),
            Some(v) if v.is_array() => Ok(Some(v.clone())),
            Some(_) => Err(ToolError::invalid(name, "an array")),
        }
    }
}

fn int_like(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// JSON object builder that leaves absent optional fields out entirely.
#[derive(Debug, Default)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    /// Insert `value` only when present; `None` never becomes `null`
    pub fn field_opt<T: Into<Value>>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self,
        }
    }

    pub fn build(self) -> Value {
        Value::Object(self.0)
    }
}
