//! The `redmine_version` resource: schema, state conversions and
//! resource-specific validation.

use chrono::NaiveDate;
use serde_json::{json, Value};

use super::{string_attr, u32_attr};
use crate::client::Version;
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

pub const TYPE: &str = "redmine_version";

/// Version statuses Redmine accepts.
pub const STATUSES: [&str; 3] = ["open", "locked", "closed"];

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Numeric version identifier"),
        )
        .with_attribute(
            "project_id",
            Attribute::required_int64()
                .with_description("Identifier of the owning project; cannot be changed")
                .with_force_new(),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("Version name"),
        )
        .with_attribute(
            "description",
            Attribute::required_string().with_description("Version description"),
        )
        .with_attribute(
            "status",
            Attribute::optional_string()
                .with_description("One of open, locked or closed")
                .with_default(json!("open")),
        )
        .with_attribute(
            "due_date",
            Attribute::optional_string()
                .with_description("Due date in YYYY-MM-DD format, empty for none")
                .with_default(json!("")),
        )
        .with_attribute("created_on", Attribute::optional_computed_string())
        .with_attribute("updated_on", Attribute::optional_computed_string())
}

/// Checks the value constraints schema typing cannot express.
pub fn validate_config(config: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if let Some(status) = config.get("status").and_then(Value::as_str) {
        if !STATUSES.contains(&status) {
            diagnostics.push(
                Diagnostic::error("Invalid version status")
                    .with_detail(format!(
                        "Status must be one of open, locked or closed, got {:?}",
                        status
                    ))
                    .with_attribute("status"),
            );
        }
    }

    if let Some(due_date) = config.get("due_date").and_then(Value::as_str) {
        if !due_date.is_empty() && NaiveDate::parse_from_str(due_date, DATE_FORMAT).is_err() {
            diagnostics.push(
                Diagnostic::error("Invalid due date")
                    .with_detail(format!(
                        "Due date must be empty or formatted as YYYY-MM-DD, got {:?}",
                        due_date
                    ))
                    .with_attribute("due_date"),
            );
        }
    }

    diagnostics
}

pub fn from_state(state: &Value) -> Result<Version, ProviderError> {
    Ok(Version {
        id: string_attr(state, "id"),
        project_id: u32_attr(state, "project_id")?,
        name: string_attr(state, "name"),
        description: string_attr(state, "description"),
        status: string_attr(state, "status"),
        due_date: string_attr(state, "due_date"),
        created_on: string_attr(state, "created_on"),
        updated_on: string_attr(state, "updated_on"),
    })
}

pub fn to_state(version: &Version) -> Value {
    json!({
        "id": version.id,
        "project_id": version.project_id,
        "name": version.name,
        "description": version.description,
        "status": version.status,
        "due_date": version.due_date,
        "created_on": version.created_on,
        "updated_on": version.updated_on,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defaults() {
        let schema = schema();
        assert_eq!(schema.attributes["status"].default, Some(json!("open")));
        assert_eq!(schema.attributes["due_date"].default, Some(json!("")));
        assert!(schema.attributes["description"].flags.required);
        assert!(schema.attributes["project_id"].force_new);
    }

    #[test]
    fn test_schema_rejects_missing_description() {
        let config = json!({"project_id": 3, "name": "1.0.0"});
        let diagnostics = crate::validation::validate(&schema(), &config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("description"));
    }

    #[test]
    fn test_validate_config_accepts_known_statuses() {
        for status in STATUSES {
            let config = json!({"project_id": 3, "name": "1.0.0", "status": status});
            assert!(validate_config(&config).is_empty(), "status {}", status);
        }
    }

    #[test]
    fn test_validate_config_rejects_unknown_status() {
        let config = json!({"project_id": 3, "name": "1.0.0", "status": "done"});
        let diagnostics = validate_config(&config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("status"));
    }

    #[test]
    fn test_validate_config_due_date() {
        let ok = json!({"due_date": "2024-06-30"});
        assert!(validate_config(&ok).is_empty());

        let empty = json!({"due_date": ""});
        assert!(validate_config(&empty).is_empty());

        let bad = json!({"due_date": "30.06.2024"});
        let diagnostics = validate_config(&bad);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("due_date"));

        // Not a real calendar date
        let impossible = json!({"due_date": "2024-02-31"});
        assert_eq!(validate_config(&impossible).len(), 1);
    }

    #[test]
    fn test_state_round_trip() {
        let state = json!({
            "id": "21",
            "project_id": 3,
            "name": "1.0.0",
            "description": "first stable",
            "status": "open",
            "due_date": "2024-06-30",
            "created_on": "2024-03-01T12:00:00Z",
            "updated_on": "2024-03-02T12:00:00Z",
        });

        let version = from_state(&state).unwrap();
        assert_eq!(version.status, "open");
        assert_eq!(version.due_date, "2024-06-30");
        assert_eq!(to_state(&version), state);
    }
}
