//! The `redmine_issue_category` resource: schema and state conversions.

use serde_json::{json, Value};

use super::{string_attr, u32_attr};
use crate::client::IssueCategory;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

pub const TYPE: &str = "redmine_issue_category";

pub fn schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Numeric category identifier"),
        )
        .with_attribute(
            "project_id",
            Attribute::required_int64()
                .with_description("Identifier of the owning project; cannot be changed")
                .with_force_new(),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("Category name"),
        )
}

pub fn from_state(state: &Value) -> Result<IssueCategory, ProviderError> {
    Ok(IssueCategory {
        id: string_attr(state, "id"),
        project_id: u32_attr(state, "project_id")?,
        name: string_attr(state, "name"),
    })
}

pub fn to_state(category: &IssueCategory) -> Value {
    json!({
        "id": category.id,
        "project_id": category.project_id,
        "name": category.name,
    })
}
