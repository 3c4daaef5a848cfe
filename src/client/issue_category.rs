//! Issue category resource: domain record, wire payloads and CRUD calls.
//!
//! Categories are created underneath a project
//! (`POST /projects/{project_id}/issue_categories.json`) but addressed
//! directly for read/update/delete.

use serde::{Deserialize, Serialize};

use super::{Client, IdName};
use crate::error::ProviderError;
use crate::id;

/// A Redmine issue category as it appears in resource state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IssueCategory {
    /// String-encoded identifier, "" or "0" before creation.
    pub id: String,
    /// Owning project.
    pub project_id: u32,
    /// Category name.
    pub name: String,
}

#[derive(Debug, Serialize)]
struct IssueCategoryPayload<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct IssueCategoryRequest<'a> {
    issue_category: IssueCategoryPayload<'a>,
}

#[derive(Debug, Deserialize)]
struct ApiIssueCategory {
    id: u32,
    #[serde(default)]
    project: Option<IdName>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct IssueCategoryResponse {
    issue_category: ApiIssueCategory,
}

fn wrap_issue_category(category: &IssueCategory) -> IssueCategoryRequest<'_> {
    IssueCategoryRequest {
        issue_category: IssueCategoryPayload {
            name: &category.name,
        },
    }
}

fn unwrap_issue_category(api: ApiIssueCategory) -> IssueCategory {
    IssueCategory {
        id: id::format(api.id),
        project_id: api.project.map(|p| p.id).unwrap_or_default(),
        name: api.name,
    }
}

impl Client {
    /// Create an issue category under its project.
    pub async fn create_issue_category(
        &self,
        category: &IssueCategory,
    ) -> Result<IssueCategory, ProviderError> {
        let request = wrap_issue_category(category);
        let response: IssueCategoryResponse = self
            .post_json(
                &format!("projects/{}/issue_categories.json", category.project_id),
                &request,
            )
            .await
            .map_err(|e| {
                e.context(format!(
                    "while creating issue category (project id: {}, name: {:?})",
                    category.project_id, category.name
                ))
            })?;
        let mut created = unwrap_issue_category(response.issue_category);
        if created.project_id == 0 {
            created.project_id = category.project_id;
        }
        Ok(created)
    }

    /// Read an issue category by its identifier.
    pub async fn read_issue_category(
        &self,
        category_id: &str,
    ) -> Result<IssueCategory, ProviderError> {
        let numeric_id = id::parse(category_id)
            .map_err(|e| e.context("could not read issue category"))?;
        let response: IssueCategoryResponse = self
            .get_json(&format!("issue_categories/{}.json", numeric_id))
            .await
            .map_err(|e| e.context(format!("while reading issue category (id {})", numeric_id)))?;
        Ok(unwrap_issue_category(response.issue_category))
    }

    /// Update an existing issue category. The server returns no body.
    pub async fn update_issue_category(
        &self,
        category: &IssueCategory,
    ) -> Result<(), ProviderError> {
        let numeric_id = id::parse(&category.id).map_err(|e| {
            e.context(format!(
                "could not update issue category {:?}",
                category.name
            ))
        })?;
        let request = wrap_issue_category(category);
        self.put_json(&format!("issue_categories/{}.json", numeric_id), &request)
            .await
            .map_err(|e| e.context(format!("while updating issue category (id {})", numeric_id)))
    }

    /// Delete an issue category by its identifier.
    pub async fn delete_issue_category(&self, category_id: &str) -> Result<(), ProviderError> {
        let numeric_id = id::parse(category_id)
            .map_err(|e| e.context("could not delete issue category"))?;
        self.delete_json(&format!("issue_categories/{}.json", numeric_id))
            .await
            .map_err(|e| e.context(format!("while deleting issue category (id {})", numeric_id)))
    }
}
