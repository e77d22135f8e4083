//! Typed parameter descriptors and the shared argument validator
//!
//! Every tool declares its inputs as a list of [`ParamSpec`]s. The same
//! validator checks arguments for all tools, fills defaults, and renders the
//! descriptors as JSON Schema for `tools/list`.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

/// Type constraint for one parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    String,
    Integer { min: Option<i64>, max: Option<i64> },
    StringArray,
    Enum(&'static [&'static str]),
}

/// One declared tool parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    pub fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            description,
        }
    }

    /// Value substituted when the argument is absent
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn check(&self, value: &Value) -> std::result::Result<(), String> {
        match &self.kind {
            ParamKind::String => value
                .as_str()
                .map(|_| ())
                .ok_or_else(|| format!("'{}' must be a string", self.name)),
            ParamKind::Integer { min, max } => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| format!("'{}' must be an integer", self.name))?;
                if let Some(min) = min {
                    if n < *min {
                        return Err(format!("'{}' must be at least {}", self.name, min));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(format!("'{}' must be at most {}", self.name, max));
                    }
                }
                Ok(())
            }
            ParamKind::StringArray => {
                let items = value
                    .as_array()
                    .ok_or_else(|| format!("'{}' must be an array of strings", self.name))?;
                if items.iter().all(Value::is_string) {
                    Ok(())
                } else {
                    Err(format!("'{}' must contain only strings", self.name))
                }
            }
            ParamKind::Enum(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => Ok(()),
                _ => Err(format!(
                    "'{}' must be one of: {}",
                    self.name,
                    allowed.join(", ")
                )),
            },
        }
    }

    fn json_schema(&self) -> Value {
        let mut schema = match &self.kind {
            ParamKind::String => json!({"type": "string"}),
            ParamKind::Integer { min, max } => {
                let mut s = json!({"type": "integer"});
                if let Some(min) = min {
                    s["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    s["maximum"] = json!(max);
                }
                s
            }
            ParamKind::StringArray => json!({"type": "array", "items": {"type": "string"}}),
            ParamKind::Enum(allowed) => json!({"type": "string", "enum": allowed}),
        };
        if !self.description.is_empty() {
            schema["description"] = json!(self.description);
        }
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        schema
    }
}

/// Input schema of a tool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSchema {
    params: Vec<ParamSpec>,
}

impl ToolSchema {
    /// Schema for a tool that takes no arguments
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Validate raw arguments, returning them with defaults applied.
    ///
    /// All violations are collected into one message. Keys that are not
    /// declared are dropped.
    pub fn validate(&self, raw: &Value) -> std::result::Result<ToolArgs, String> {
        let empty = Map::new();
        let object = match raw {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(format!(
                    "arguments must be an object, got {}",
                    json_type_name(other)
                ))
            }
        };

        let mut violations = Vec::new();
        let mut validated = Map::new();

        for param in &self.params {
            match object.get(param.name) {
                Some(Value::Null) | None => {
                    if let Some(default) = &param.default {
                        validated.insert(param.name.to_string(), default.clone());
                    } else if param.required {
                        violations.push(format!("'{}' is required", param.name));
                    }
                }
                Some(value) => match param.check(value) {
                    Ok(()) => {
                        validated.insert(param.name.to_string(), value.clone());
                    }
                    Err(violation) => violations.push(violation),
                },
            }
        }

        if violations.is_empty() {
            Ok(ToolArgs(validated))
        } else {
            Err(violations.join("; "))
        }
    }

    /// Render as a JSON Schema object for discovery
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Arguments that passed schema validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    pub fn strings(&self, name: &str) -> Option<Vec<String>> {
        self.0.get(name).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
    }

    /// Deserialize the validated arguments into a typed struct
    pub fn parse<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn search_schema() -> ToolSchema {
        ToolSchema::new(vec![
            ParamSpec::required("query", ParamKind::String, "Search query"),
            ParamSpec::optional(
                "limit",
                ParamKind::Integer {
                    min: Some(1),
                    max: Some(50),
                },
                "Maximum results",
            )
            .with_default(json!(5)),
            ParamSpec::optional("tags", ParamKind::StringArray, ""),
        ])
    }

    #[test]
    fn test_defaults_are_applied() {
        let args = search_schema().validate(&json!({"query": "rust"})).unwrap();
        assert_eq!(args.str("query"), Some("rust"));
        assert_eq!(args.integer("limit"), Some(5));
        assert_eq!(args.strings("tags"), None);
    }

    #[test]
    fn test_violations_are_collected() {
        let err = search_schema()
            .validate(&json!({"limit": 500, "tags": ["ok", 3]}))
            .unwrap_err();
        assert!(err.contains("'query' is required"), "{err}");
        assert!(err.contains("'limit' must be at most 50"), "{err}");
        assert!(err.contains("'tags' must contain only strings"), "{err}");
    }

    #[test]
    fn test_null_arguments_mean_empty_object() {
        assert!(ToolSchema::empty().validate(&Value::Null).is_ok());
        let err = ToolSchema::empty().validate(&json!([1, 2])).unwrap_err();
        assert_eq!(err, "arguments must be an object, got array");
    }

    #[test]
    fn test_unknown_keys_are_dropped() {
        let args = search_schema()
            .validate(&json!({"query": "q", "extra": true}))
            .unwrap();
        assert!(!args.into_value().as_object().unwrap().contains_key("extra"));
    }

    #[test]
    fn test_enum_rejects_unlisted_values() {
        let schema = ToolSchema::new(vec![ParamSpec::optional(
            "safety",
            ParamKind::Enum(&["off", "strict"]),
            "",
        )]);
        assert!(schema.validate(&json!({"safety": "strict"})).is_ok());
        let err = schema.validate(&json!({"safety": "loose"})).unwrap_err();
        assert_eq!(err, "'safety' must be one of: off, strict");
    }

    #[test]
    fn test_json_schema_rendering() {
        let schema = search_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(schema["properties"]["limit"]["maximum"], 50);
        assert_eq!(schema["properties"]["limit"]["default"], 5);
        assert_eq!(schema["properties"]["tags"]["items"]["type"], "string");

        let empty = ToolSchema::empty().to_json_schema();
        assert_eq!(empty, json!({"type": "object", "properties": {}}));
    }
}
