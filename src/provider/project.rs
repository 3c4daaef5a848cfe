//! The `redmine_project` resource: schema and state conversions.

use serde_json::{json, Value};

use super::{bool_attr, string_attr};
use crate::client::Project;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

pub const TYPE: &str = "redmine_project";

pub fn schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Numeric project identifier"),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("Display name of the project"),
        )
        .with_attribute(
            "identifier",
            Attribute::required_string()
                .with_description("Project key used in URLs; cannot be changed after creation")
                .with_force_new(),
        )
        .with_attribute(
            "description",
            Attribute::optional_string()
                .with_description("Project description")
                .with_default(json!("")),
        )
        .with_attribute(
            "homepage",
            Attribute::optional_string()
                .with_description("Project homepage URL")
                .with_default(json!("")),
        )
        .with_attribute(
            "is_public",
            Attribute::optional_bool()
                .with_description("Whether the project is visible to anonymous users")
                .with_default(json!(true)),
        )
        .with_attribute(
            "parent_id",
            Attribute::optional_string()
                .with_description("Identifier of the parent project, empty for top-level")
                .with_default(json!("")),
        )
        .with_attribute(
            "inherit_members",
            Attribute::optional_bool()
                .with_description("Whether members are inherited from the parent project")
                .with_default(json!(false)),
        )
        .with_attribute("created_on", Attribute::optional_computed_string())
        .with_attribute("updated_on", Attribute::optional_computed_string())
}

pub fn from_state(state: &Value) -> Result<Project, ProviderError> {
    Ok(Project {
        id: string_attr(state, "id"),
        name: string_attr(state, "name"),
        identifier: string_attr(state, "identifier"),
        description: string_attr(state, "description"),
        homepage: string_attr(state, "homepage"),
        is_public: bool_attr(state, "is_public", true),
        parent_id: string_attr(state, "parent_id"),
        inherit_members: bool_attr(state, "inherit_members", false),
        created_on: string_attr(state, "created_on"),
        updated_on: string_attr(state, "updated_on"),
    })
}

pub fn to_state(project: &Project) -> Value {
    json!({
        "id": project.id,
        "name": project.name,
        "identifier": project.identifier,
        "description": project.description,
        "homepage": project.homepage,
        "is_public": project.is_public,
        "parent_id": project.parent_id,
        "inherit_members": project.inherit_members,
        "created_on": project.created_on,
        "updated_on": project.updated_on,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_marks_identifier_force_new() {
        let schema = schema();
        assert!(schema.attributes["identifier"].force_new);
        assert!(!schema.attributes["name"].force_new);
        assert!(schema.attributes["id"].flags.computed);
        assert!(schema.attributes["created_on"].flags.optional);
        assert!(schema.attributes["created_on"].flags.computed);
    }

    #[test]
    fn test_timestamps_are_type_checked() {
        let config = json!({"name": "Web Shop", "identifier": "web-shop", "created_on": 5});
        let diagnostics = crate::validation::validate(&schema(), &config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("created_on"));
    }

    #[test]
    fn test_state_round_trip() {
        let state = json!({
            "id": "4",
            "name": "Web Shop",
            "identifier": "web-shop",
            "description": "storefront",
            "homepage": "https://shop.example",
            "is_public": false,
            "parent_id": "12",
            "inherit_members": true,
            "created_on": "2024-01-05T09:30:00Z",
            "updated_on": "2024-01-06T10:00:00Z",
        });

        let project = from_state(&state).unwrap();
        assert_eq!(project.identifier, "web-shop");
        assert!(!project.is_public);
        assert_eq!(project.parent_id, "12");
        assert_eq!(to_state(&project), state);
    }

    #[test]
    fn test_from_state_fills_missing_attributes() {
        let state = json!({"name": "Web Shop", "identifier": "web-shop"});

        let project = from_state(&state).unwrap();
        assert_eq!(project.id, "");
        assert_eq!(project.description, "");
        // is_public follows the schema default when the attribute is absent
        assert!(project.is_public);
        assert!(!project.inherit_members);
    }
}
