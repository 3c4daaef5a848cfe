//! The `redmine_issue` resource: schema and state conversions.

use serde_json::{json, Value};

use super::{string_attr, u32_attr};
use crate::client::Issue;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

pub const TYPE: &str = "redmine_issue";

pub fn schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Numeric issue identifier"),
        )
        .with_attribute(
            "project_id",
            Attribute::required_int64()
                .with_description("Identifier of the project the issue belongs to"),
        )
        .with_attribute(
            "tracker_id",
            Attribute::required_int64()
                .with_description("Identifier of the tracker (bug, feature, ...)"),
        )
        .with_attribute(
            "subject",
            Attribute::required_string().with_description("Issue subject line"),
        )
        .with_attribute(
            "description",
            Attribute::optional_string()
                .with_description("Issue description")
                .with_default(json!("")),
        )
        .with_attribute(
            "parent_issue_id",
            Attribute::optional_int64()
                .with_description("Identifier of the parent issue, 0 for none")
                .with_default(json!(0)),
        )
        .with_attribute(
            "priority_id",
            Attribute::optional_int64()
                .with_description("Identifier of the issue priority, 0 for the server default")
                .with_default(json!(0)),
        )
        .with_attribute(
            "category_id",
            Attribute::optional_int64()
                .with_description("Identifier of the issue category, 0 for none")
                .with_default(json!(0)),
        )
        .with_attribute("created_on", Attribute::optional_computed_string())
        .with_attribute("updated_on", Attribute::optional_computed_string())
}

pub fn from_state(state: &Value) -> Result<Issue, ProviderError> {
    Ok(Issue {
        id: string_attr(state, "id"),
        project_id: u32_attr(state, "project_id")?,
        tracker_id: u32_attr(state, "tracker_id")?,
        subject: string_attr(state, "subject"),
        description: string_attr(state, "description"),
        parent_issue_id: u32_attr(state, "parent_issue_id")?,
        priority_id: u32_attr(state, "priority_id")?,
        category_id: u32_attr(state, "category_id")?,
        created_on: string_attr(state, "created_on"),
        updated_on: string_attr(state, "updated_on"),
    })
}

pub fn to_state(issue: &Issue) -> Value {
    json!({
        "id": issue.id,
        "project_id": issue.project_id,
        "tracker_id": issue.tracker_id,
        "subject": issue.subject,
        "description": issue.description,
        "parent_issue_id": issue.parent_issue_id,
        "priority_id": issue.priority_id,
        "category_id": issue.category_id,
        "created_on": issue.created_on,
        "updated_on": issue.updated_on,
    })
}
