//! Schema validation helpers.
//!
//! Validates resource state values against a [`Schema`] and applies declared
//! defaults to absent optional attributes.
//!
//! # Example
//!
//! ```
//! use redmine_provider::schema::{Schema, Attribute};
//! use redmine_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("project_id", Attribute::optional_int64());
//!
//! let diagnostics = validate(&schema, &json!({"name": "web", "project_id": 3}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"project_id": "three"}));
//! assert_eq!(diagnostics.len(), 2);
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, DiagnosticSeverity, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found. An empty
/// list means the value is valid.
///
/// Required attributes must be present and non-null; optional attributes may
/// be absent or null; computed-only attributes are skipped (the provider sets
/// them); present values must match the declared type.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return Vec::new(),
        other => {
            return vec![Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(other)))];
        }
    };

    let mut diagnostics = Vec::new();
    for (name, attr) in &schema.attributes {
        validate_attribute(attr, obj.get(name.as_str()), name, &mut diagnostics);
    }
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Fill absent or null optional attributes with their schema defaults.
///
/// Non-object values are returned unchanged.
pub fn apply_defaults(schema: &Schema, value: &Value) -> Value {
    let mut obj = match value {
        Value::Object(map) => map.clone(),
        _ => return value.clone(),
    };

    for (name, attr) in &schema.attributes {
        if let Some(default) = &attr.default {
            let missing = matches!(obj.get(name.as_str()), None | Some(Value::Null));
            if missing {
                obj.insert(name.clone(), default.clone());
            }
        }
    }

    Value::Object(obj)
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Computed-only attributes are filled by the provider
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => validate_attribute_type(attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let ok = match attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => is_int64(value),
        AttributeType::Bool => value.is_boolean(),
    };

    if !ok {
        let expected = match attr_type {
            AttributeType::String => "string",
            AttributeType::Int64 => "int64",
            AttributeType::Bool => "bool",
        };
        diagnostics.push(Diagnostic {
            severity: DiagnosticSeverity::Error,
            summary: format!("Invalid type for attribute '{}'", path),
            detail: Some(format!(
                "Expected {}, got {}",
                expected,
                value_type_name(value)
            )),
            attribute: Some(path.to_string()),
        });
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.as_i64().is_some() {
                true
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "test"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_optional_attribute() {
        let schema = Schema::v0().with_attribute("project_id", Attribute::optional_int64());

        assert!(validate(&schema, &json!({"project_id": 42})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"project_id": null})).is_empty());

        let diagnostics = validate(&schema, &json!({"project_id": "forty-two"}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("id", Attribute::computed_string());

        assert!(validate(&schema, &json!({})).is_empty());
        // Computed-only attrs are not type checked either
        assert!(validate(&schema, &json!({"id": 123})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("tracker_id", Attribute::required_int64());

        assert!(validate(&schema, &json!({"tracker_id": 4})).is_empty());
        assert!(validate(&schema, &json!({"tracker_id": 4.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"tracker_id": 4.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"tracker_id": "4"})).len(), 1);
    }

    #[test]
    fn test_validate_bool() {
        let schema = Schema::v0().with_attribute("is_public", Attribute::optional_bool());

        assert!(validate(&schema, &json!({"is_public": true})).is_empty());
        assert_eq!(validate(&schema, &json!({"is_public": "true"})).len(), 1);
    }

    #[test]
    fn test_validate_multiple_errors() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("project_id", Attribute::required_int64());

        let diagnostics = validate(&schema, &json!({"name": 1, "project_id": "x"}));
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }

    #[test]
    fn test_validate_null_root_is_valid() {
        // Plan passes null for delete; nothing to validate.
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        assert!(validate(&schema, &Value::Null).is_empty());
    }

    #[test]
    fn test_validate_result_helper() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate_result(&schema, &json!({"name": "test"})).is_ok());
        assert!(is_valid(&schema, &json!({"name": "test"})));

        let result = validate_result(&schema, &json!({}));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().len(), 1);
    }

    #[test]
    fn test_apply_defaults() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute(
                "is_public",
                Attribute::optional_bool().with_default(json!(true)),
            )
            .with_attribute(
                "description",
                Attribute::optional_string().with_default(json!("")),
            );

        let filled = apply_defaults(&schema, &json!({"name": "web"}));
        assert_eq!(filled["is_public"], json!(true));
        assert_eq!(filled["description"], json!(""));
        assert_eq!(filled["name"], json!("web"));

        // Explicit values win over defaults
        let filled = apply_defaults(&schema, &json!({"name": "web", "is_public": false}));
        assert_eq!(filled["is_public"], json!(false));

        // Null is treated as absent
        let filled = apply_defaults(&schema, &json!({"name": "web", "description": null}));
        assert_eq!(filled["description"], json!(""));
    }
}
